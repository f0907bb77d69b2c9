//! Command-line and environment configuration of the server binary.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::binding::Binding;
use crate::service::MissingRowPolicy;
use crate::store::DEFAULT_DATABASE_URL;
use crate::telemetry::LogFormat;

pub const DEFAULT_ADDR: &str = "0.0.0.0:50051";

#[derive(Debug, Clone, Parser)]
#[command(name = "todo-server", version, about = "Connect, gRPC and gRPC-Web to-do service")]
pub struct ServerConfig {
    /// Address to listen on.
    #[arg(long, env = "TODO_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: SocketAddr,

    /// SQLite database URL; the file is created if missing.
    #[arg(long, env = "DATABASE_URL", default_value = DEFAULT_DATABASE_URL)]
    pub database_url: String,

    /// Protocol surface to expose.
    #[arg(long, env = "TODO_BINDING", value_enum, default_value_t = Binding::Negotiated)]
    pub binding: Binding,

    /// What UpdateStatus does when no row has the requested id.
    #[arg(long, env = "TODO_MISSING_ROW", value_enum, default_value_t = MissingRowPolicy::Ignore)]
    pub missing_row: MissingRowPolicy,

    /// Upper bound for every call's deadline, in milliseconds.
    #[arg(long, env = "TODO_CALL_TIMEOUT_MS")]
    pub call_timeout_ms: Option<u64>,

    #[arg(long, env = "TODO_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl ServerConfig {
    pub fn call_timeout(&self) -> Option<Duration> {
        self.call_timeout_ms.map(Duration::from_millis)
    }
}
