//! Error types for the to-do RPC client.
//!
//! # Design
//! `NotFound` gets a dedicated variant because callers frequently distinguish
//! "the item does not exist" from other failures. Every other RPC status
//! lands in `Rpc` with its code and message; transport-level surprises and
//! codec failures have their own variants.

use thiserror::Error;
use todo_proto::Code;

/// Errors returned by `ToDoClient` build and parse methods.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered `not_found`.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server answered with any other non-OK status.
    #[error("rpc failed with {}: {message}", code_label(.code))]
    Rpc { code: Code, message: String },

    /// The response matched no protocol rule (e.g. a gRPC-Web answer without
    /// status).
    #[error("unexpected response: HTTP {status}")]
    UnexpectedStatus { status: u16 },

    /// The response body could not be decoded into the expected message.
    #[error("decoding failed: {0}")]
    Decode(String),

    /// The request message could not be encoded.
    #[error("encoding failed: {0}")]
    Encode(String),
}

fn code_label(code: &Code) -> &'static str {
    todo_proto::connect::code_name(*code)
}

impl ApiError {
    pub(crate) fn from_status(code: Code, message: String) -> Self {
        match code {
            Code::NotFound => ApiError::NotFound(message),
            code => ApiError::Rpc { code, message },
        }
    }

    /// The RPC code, for errors that carry one.
    pub fn code(&self) -> Option<Code> {
        match self {
            ApiError::NotFound(_) => Some(Code::NotFound),
            ApiError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}
