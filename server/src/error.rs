//! Error types for the store, the handlers and server startup.
//!
//! # Design
//! Each layer has its own `thiserror` enum. [`StoreError`] wraps the backend;
//! [`ServiceError`] is what handlers return. Every protocol front end puts a
//! [`tonic::Status`] on the wire, built from a `ServiceError` by the `From`
//! impl below. Conversions run in that direction only.

use thiserror::Error;
use tonic::{Code, Status};

/// Failure of a single store primitive.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),

    /// The call's deadline passed before or while the statement ran.
    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Typed outcome of a failed handler call.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request is malformed: empty title, unknown status value.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// No row matched the requested id.
    #[error("{0}")]
    NotFound(String),

    /// A read or write against the store failed.
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    /// A write failed for a reason other than "not found".
    #[error("{0}")]
    Internal(String),
}

impl From<ServiceError> for Status {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Validation(msg) => Status::invalid_argument(msg),
            ServiceError::NotFound(msg) => Status::not_found(msg),
            ServiceError::Storage(StoreError::DeadlineExceeded) => {
                Status::deadline_exceeded("deadline exceeded")
            }
            err @ ServiceError::Storage(StoreError::Backend(_)) => Status::internal(err.to_string()),
            ServiceError::Internal(msg) => Status::new(Code::Internal, msg),
        }
    }
}

/// Failure to assemble or run the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot build the reflection service: {0}")]
    Reflection(#[from] tonic_reflection::server::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
