use std::error::Error;

use clap::Parser;
use tokio::net::TcpListener;
use todo_server::config::ServerConfig;
use todo_server::{telemetry, AppState, Store, ToDoHandlers};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ServerConfig::parse();
    telemetry::init(config.log_format)?;

    let store = Store::connect(&config.database_url).await?;
    let handlers = ToDoHandlers::new(store.clone()).with_missing_row_policy(config.missing_row);
    let state = AppState::new(handlers)
        .with_binding(config.binding)
        .with_call_timeout(config.call_timeout());

    let listener = TcpListener::bind(config.addr).await?;
    info!(addr = %config.addr, binding = ?config.binding, "listening");
    todo_server::run(listener, state, shutdown_signal()).await?;

    store.close().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(%err, "cannot listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
