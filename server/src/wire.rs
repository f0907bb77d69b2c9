//! Protocol negotiation by content type.
//!
//! # Overview
//! Connect, gRPC and gRPC-Web all post to `/<service>/<method>`:
//!
//! | Content type | Wire | Served by |
//! |---|---|---|
//! | `application/proto`, `application/json` | [`Wire::Connect`] | [`crate::connect`] |
//! | `application/grpc`, `application/grpc+proto` | [`Wire::Grpc`] | tonic |
//! | `application/grpc-web[+proto]` | [`Wire::GrpcWeb`] | `tonic-web` in front of tonic |
//! | `application/grpc-web-text[+proto]` | [`Wire::GrpcWeb`] with `text` | same, base64 |
//!
//! gRPC framing, trailers and status encoding are tonic's; this module only
//! decides which front end a request goes to, plus one repair of
//! `grpc-web-text` bodies (see [`join_base64_chunks`]).

use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;

/// Largest message accepted on any wire.
pub const MAX_MESSAGE_SIZE: usize = 4 * 1024 * 1024;

/// Largest request body: one message plus its 5-byte envelope header,
/// base64-expanded for `grpc-web-text`.
pub const MAX_BODY_SIZE: usize = (MAX_MESSAGE_SIZE + 5).div_ceil(3) * 4;

/// Connect message serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Proto,
    Json,
}

/// Protocol of a request, resolved from its content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wire {
    Connect(Codec),
    Grpc,
    GrpcWeb { text: bool },
}

impl Wire {
    /// Parameters (`; charset=utf-8`) and case are ignored.
    pub fn from_content_type(content_type: &str) -> Option<Wire> {
        let media = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let wire = match media.as_str() {
            "application/proto" => Wire::Connect(Codec::Proto),
            "application/json" => Wire::Connect(Codec::Json),
            "application/grpc" | "application/grpc+proto" => Wire::Grpc,
            "application/grpc-web" | "application/grpc-web+proto" => Wire::GrpcWeb { text: false },
            "application/grpc-web-text" | "application/grpc-web-text+proto" => {
                Wire::GrpcWeb { text: true }
            }
            _ => return None,
        };
        Some(wire)
    }

    pub fn from_headers(headers: &HeaderMap) -> Option<Wire> {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(Wire::from_content_type)
    }

    /// Plain gRPC, which needs HTTP/2 trailers.
    pub fn is_grpc(self) -> bool {
        self == Wire::Grpc
    }

    /// Served by tonic rather than by the Connect handler.
    pub fn is_grpc_family(self) -> bool {
        !matches!(self, Wire::Connect(_))
    }
}

/// Re-encodes a `grpc-web-text` body made of separately padded base64
/// chunks (`"AAAAAA==AAAABg=="`) as one canonical base64 string.
///
/// Streaming clients encode each write on its own, so padding may appear in
/// the middle of the body; a single decode rejects that. Bodies without
/// inner padding come back unchanged.
pub fn join_base64_chunks(body: Bytes) -> Result<Bytes, base64::DecodeError> {
    let text = body.trim_ascii();
    let Some(first_pad) = text.iter().position(|b| *b == b'=') else {
        return Ok(body);
    };
    if text[first_pad..].iter().all(|b| *b == b'=') {
        return Ok(body);
    }

    let mut raw = Vec::with_capacity(text.len() / 4 * 3);
    let mut rest = text;
    while !rest.is_empty() {
        let end = match rest.iter().position(|b| *b == b'=') {
            Some(pad) => {
                let run = rest[pad..].iter().take_while(|b| **b == b'=').count();
                pad + run
            }
            None => rest.len(),
        };
        raw.extend(STANDARD.decode(&rest[..end])?);
        rest = &rest[end..];
    }
    Ok(Bytes::from(STANDARD.encode(raw)))
}
