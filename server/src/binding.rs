//! Protocol bindings: which wires and methods a server exposes, and the
//! state shared by every route.
//!
//! # Overview
//! Three bindings are available:
//!
//! - [`Binding::Negotiated`]: Connect, gRPC and gRPC-Web on one route, chosen
//!   per request by content type. CORS is enabled for browser clients.
//! - [`Binding::Grpc`]: plain gRPC only, plus server reflection.
//! - [`Binding::Minimal`]: plain gRPC, and only `Create` is exposed. The
//!   other methods answer `unimplemented`.
//!
//! Every binding runs the same [`ToDoService`]; [`crate::connect`] and
//! [`crate::grpc`] consult the binding before dispatching.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use todo_proto::Method;

use crate::classify::{ProtocolObserver, TracingObserver};
use crate::service::ToDoService;
use crate::wire::Wire;

/// Protocol surface exposed by a server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Binding {
    /// Connect, gRPC and gRPC-Web.
    #[default]
    Negotiated,
    /// gRPC with server reflection.
    Grpc,
    /// gRPC, `Create` only.
    Minimal,
}

impl Binding {
    pub fn accepts(self, wire: Wire) -> bool {
        match self {
            Binding::Negotiated => true,
            Binding::Grpc | Binding::Minimal => wire.is_grpc(),
        }
    }

    pub fn exposes(self, method: Method) -> bool {
        self != Binding::Minimal || method == Method::Create
    }

    pub fn serves_reflection(self) -> bool {
        self == Binding::Grpc
    }

    pub fn allows_cors(self) -> bool {
        self == Binding::Negotiated
    }
}

/// Shared state of every route.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<dyn ToDoService>,
    pub binding: Binding,
    pub observer: Arc<dyn ProtocolObserver>,
    /// Server-side cap on every call's deadline.
    pub call_timeout: Option<Duration>,
}

impl AppState {
    pub fn new(service: impl ToDoService) -> Self {
        Self {
            service: Arc::new(service),
            binding: Binding::default(),
            observer: Arc::new(TracingObserver),
            call_timeout: None,
        }
    }

    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ProtocolObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Paths outside the service. gRPC-family requests never get here; tonic
/// answers those with `unimplemented`.
pub async fn fallback() -> Response {
    StatusCode::NOT_FOUND.into_response()
}
