//! Synchronous RPC client core for `greeter.ToDoService`.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `ToDoClient` is stateless: it holds the base URL, the protocol flavour
//!   and an optional per-call timeout.
//! - Each operation is split into `build_*` (produces request) and `parse_*`
//!   (consumes response), so the I/O boundary is explicit.
//! - Every call is a `POST` to `/greeter.ToDoService/<Method>`; only the
//!   content type, headers and body framing differ per [`ClientProtocol`].
//! - Wire messages come from `todo-proto`; callers see [`Todo`] and
//!   [`TodoInput`].

pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use client::{ClientProtocol, ToDoClient};
pub use error::ApiError;
pub use http::{HttpRequest, HttpResponse};
pub use types::{Status, Todo, TodoInput};
