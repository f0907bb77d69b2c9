//! Connect unary over axum.
//!
//! A call is a plain `POST /greeter.ToDoService/<Method>` whose body is one
//! message, binary (`application/proto`) or JSON (`application/json`). The
//! response carries the same content type on success. Failures are a JSON
//! `{"code", "message"}` body with an HTTP status picked from the code.

use std::future::Future;

use axum::extract::rejection::BytesRejection;
use axum::extract::{Path, State};
use axum::http::header::{CONTENT_ENCODING, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use prost::Message;
use serde::Serialize;
use todo_proto::{connect, JsonMessage, Method};
use tonic::Status;
use tracing::debug;

use crate::binding::{self, AppState};
use crate::context::CallContext;
use crate::error::ServiceError;
use crate::rpc;
use crate::wire::{Codec, Wire};

/// Handler of the service route for Connect content types. gRPC-family
/// requests were already taken by [`crate::grpc::route_grpc`].
pub async fn dispatch(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let codec = match Wire::from_headers(&headers) {
        Some(Wire::Connect(codec)) if state.binding.accepts(Wire::Connect(codec)) => codec,
        _ => return StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response(),
    };
    let Some(method) = Method::from_name(&name).filter(|m| state.binding.exposes(*m)) else {
        return binding::fallback().await;
    };

    let result = match body {
        Ok(body) => call(&state, method, codec, &headers, &body).await,
        Err(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => Err(
            Status::resource_exhausted(format!("request body: {}", rejection.body_text())),
        ),
        Err(rejection) => Err(Status::invalid_argument(rejection.body_text())),
    };
    match result {
        Ok(response) => response,
        Err(status) => {
            debug!(method = method.name(), code = ?status.code(), message = status.message(), "call failed");
            error_response(&status)
        }
    }
}

async fn call(
    state: &AppState,
    method: Method,
    codec: Codec,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, Status> {
    if let Some(encoding) = headers.get(CONTENT_ENCODING) {
        if encoding.as_bytes() != b"identity" {
            return Err(Status::unimplemented(format!(
                "content-encoding {encoding:?} is not supported"
            )));
        }
    }
    let ctx = CallContext::from_headers(headers, Wire::Connect(codec), state.call_timeout);
    let svc = state.service.as_ref();
    let ctx = &ctx;
    match method {
        Method::GetAll => unary(codec, body, |req| rpc::get_all(svc, ctx, req)).await,
        Method::GetOne => unary(codec, body, |req| rpc::get_one(svc, ctx, req)).await,
        Method::Create => unary(codec, body, |req| rpc::create(svc, ctx, req)).await,
        Method::Update => unary(codec, body, |req| rpc::update(svc, ctx, req)).await,
        Method::UpdateStatus => unary(codec, body, |req| rpc::update_status(svc, ctx, req)).await,
        Method::Delete => unary(codec, body, |req| rpc::delete(svc, ctx, req)).await,
    }
}

async fn unary<Req, Resp, Fut>(
    codec: Codec,
    body: &[u8],
    handler: impl FnOnce(Req) -> Fut,
) -> Result<Response, Status>
where
    Req: Message + JsonMessage + Default,
    Resp: Message + JsonMessage,
    Fut: Future<Output = Result<Resp, ServiceError>>,
{
    let request = decode::<Req>(codec, body)?;
    let response = handler(request).await?;
    let bytes = match codec {
        Codec::Proto => response.encode_to_vec(),
        Codec::Json => response
            .to_json()
            .map_err(|e| Status::internal(format!("cannot encode response: {e}")))?,
    };
    Ok((
        [(CONTENT_TYPE, HeaderValue::from_static(content_type(codec)))],
        bytes,
    )
        .into_response())
}

/// An empty JSON body stands for the default message.
fn decode<M: Message + JsonMessage + Default>(codec: Codec, body: &[u8]) -> Result<M, Status> {
    match codec {
        Codec::Proto => M::decode(body)
            .map_err(|e| Status::invalid_argument(format!("invalid binary message: {e}"))),
        Codec::Json if body.trim_ascii().is_empty() => Ok(M::default()),
        Codec::Json => M::from_json(body)
            .map_err(|e| Status::invalid_argument(format!("invalid JSON message: {e}"))),
    }
}

fn content_type(codec: Codec) -> &'static str {
    match codec {
        Codec::Proto => "application/proto",
        Codec::Json => "application/json",
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    code: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    message: &'a str,
}

fn error_response(status: &Status) -> Response {
    let http = StatusCode::from_u16(connect::http_status(status.code()))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        code: connect::code_name(status.code()),
        message: status.message(),
    };
    (http, Json(body)).into_response()
}
