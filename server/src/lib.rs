//! Multi-protocol server for `greeter.ToDoService`.
//!
//! # Overview
//! One axum router answers Connect, gRPC and gRPC-Web calls for the six
//! to-do operations, backed by SQLite:
//!
//! ```text
//! request ─► classify_request ─► [CORS] ─► route_grpc ─┬─► tonic (gRPC, gRPC-Web, reflection)
//!                 │                                   └─► connect::dispatch
//!            ProtocolObserver                                  │
//!                                              rpc ─► ToDoService ─► Store
//! ```
//!
//! # Design
//! - **Handlers are protocol-free.** [`service::ToDoService`] speaks domain
//!   types and [`error::ServiceError`]; [`rpc`] maps the `greeter` messages
//!   onto it for both front ends.
//! - **One route, many protocols.** Every protocol posts to
//!   `/greeter.ToDoService/<Method>`. [`grpc::route_grpc`] hands gRPC and
//!   gRPC-Web to tonic by content type; Connect unary stays in axum.
//!   [`binding::Binding`] narrows what a given server accepts.
//! - **Classification is observation only.** The middleware labels and logs
//!   each request; it never rejects one.
//!
//! # Usage
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use todo_server::{AppState, Store, ToDoHandlers};
//!
//! let store = Store::connect("sqlite://greeter.db").await?;
//! let state = AppState::new(ToDoHandlers::new(store));
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:50051").await?;
//! todo_server::run(listener, state, std::future::pending()).await?;
//! # Ok(())
//! # }
//! ```

pub mod binding;
pub mod classify;
pub mod config;
pub mod connect;
pub mod context;
pub mod error;
pub mod grpc;
pub mod model;
pub mod rpc;
pub mod service;
pub mod store;
pub mod telemetry;
pub mod wire;

use std::future::Future;

use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, Method};
use axum::middleware;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub use binding::{AppState, Binding};
pub use classify::{Classification, Protocol, ProtocolObserver, RecordingObserver};
pub use context::CallContext;
pub use error::{ServerError, ServiceError, StoreError};
pub use model::{NewToDo, Status, ToDoItem};
pub use service::{MissingRowPolicy, ToDoHandlers, ToDoService};
pub use store::Store;

/// Builds the router for `state.binding`.
pub fn app(state: AppState) -> Result<Router, ServerError> {
    let front = grpc::GrpcFront::new(&state)?;
    let mut router = Router::new()
        .route(
            &format!("/{}/{{method}}", todo_proto::SERVICE_NAME),
            post(connect::dispatch).layer(DefaultBodyLimit::max(wire::MAX_MESSAGE_SIZE)),
        )
        .fallback(binding::fallback)
        .layer(middleware::from_fn_with_state(front, grpc::route_grpc))
        .with_state(state.clone());
    if state.binding.allows_cors() {
        router = router.layer(cors());
    }
    Ok(router.layer(middleware::from_fn_with_state(
        state.observer.clone(),
        classify::classify_request,
    )))
}

/// Serves `state` on `listener` until `shutdown` resolves.
pub async fn run(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ServerError> {
    axum::serve(listener, app(state)?)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([
            HeaderName::from_static("grpc-status"),
            HeaderName::from_static("grpc-message"),
            HeaderName::from_static("grpc-status-details-bin"),
            HeaderName::from_static("connect-protocol-version"),
        ])
}
