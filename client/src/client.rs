//! Stateless RPC request builder and response parser.
//!
//! # Design
//! `ToDoClient` carries no mutable state between calls. Each operation is
//! split into a `build_*` method that produces an `HttpRequest` and a
//! `parse_*` method that consumes an `HttpResponse`. Encoding and decoding
//! go through two generic helpers, [`ToDoClient::build`] and
//! [`ToDoClient::parse`], which know the three protocol flavours.

use std::time::Duration;

use percent_encoding::percent_decode_str;
use prost::Message;
use serde::Deserialize;
use todo_proto::connect::{code_from_http_status, code_from_name};
use todo_proto::{
    Code, CreateRequest, CreateResponse, DeleteRequest, GetAllResponse, GetOneRequest,
    GetOneResponse, JsonMessage, Method, UpdateRequest, UpdateResponse, UpdateStatusRequest,
};

use crate::error::ApiError;
use crate::http::{HttpRequest, HttpResponse};
use crate::types::{Status, Todo, TodoInput};

/// Wire protocol the client speaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientProtocol {
    /// Connect unary with JSON bodies.
    #[default]
    ConnectJson,
    /// Connect unary with binary protobuf bodies.
    ConnectProto,
    /// gRPC-Web, binary.
    GrpcWeb,
}

impl ClientProtocol {
    fn content_type(self) -> &'static str {
        match self {
            ClientProtocol::ConnectJson => "application/json",
            ClientProtocol::ConnectProto => "application/proto",
            ClientProtocol::GrpcWeb => "application/grpc-web+proto",
        }
    }
}

/// Synchronous, stateless client for `greeter.ToDoService`.
#[derive(Debug, Clone)]
pub struct ToDoClient {
    base_url: String,
    protocol: ClientProtocol,
    timeout: Option<Duration>,
}

impl ToDoClient {
    pub fn new(base_url: &str, protocol: ClientProtocol) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            protocol,
            timeout: None,
        }
    }

    /// Asks the server to give up on each call after `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn protocol(&self) -> ClientProtocol {
        self.protocol
    }

    // --- build ---

    pub fn build_get_all(&self) -> Result<HttpRequest, ApiError> {
        self.build(Method::GetAll, &())
    }

    pub fn build_get_one(&self, id: i64) -> Result<HttpRequest, ApiError> {
        self.build(Method::GetOne, &GetOneRequest { id })
    }

    pub fn build_create(&self, input: &TodoInput) -> Result<HttpRequest, ApiError> {
        self.build(
            Method::Create,
            &CreateRequest {
                item: Some(input.into()),
            },
        )
    }

    pub fn build_update(&self, id: i64, input: &TodoInput) -> Result<HttpRequest, ApiError> {
        self.build(
            Method::Update,
            &UpdateRequest {
                id,
                item: Some(input.into()),
            },
        )
    }

    pub fn build_update_status(&self, id: i64, status: Status) -> Result<HttpRequest, ApiError> {
        self.build(
            Method::UpdateStatus,
            &UpdateStatusRequest {
                id,
                status: status as i32,
            },
        )
    }

    pub fn build_delete(&self, id: i64) -> Result<HttpRequest, ApiError> {
        self.build(Method::Delete, &DeleteRequest { id })
    }

    // --- parse ---

    pub fn parse_get_all(&self, response: HttpResponse) -> Result<Vec<Todo>, ApiError> {
        let message: GetAllResponse = self.parse(response)?;
        message.items.into_iter().map(Todo::try_from).collect()
    }

    pub fn parse_get_one(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        let message: GetOneResponse = self.parse(response)?;
        required_item(message.item)
    }

    pub fn parse_create(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        let message: CreateResponse = self.parse(response)?;
        required_item(message.item)
    }

    pub fn parse_update(&self, response: HttpResponse) -> Result<Todo, ApiError> {
        let message: UpdateResponse = self.parse(response)?;
        required_item(message.item)
    }

    pub fn parse_update_status(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.parse::<()>(response)
    }

    pub fn parse_delete(&self, response: HttpResponse) -> Result<(), ApiError> {
        self.parse::<()>(response)
    }

    // --- codec ---

    fn build<M: Message + JsonMessage>(&self, method: Method, message: &M) -> Result<HttpRequest, ApiError> {
        let mut headers = vec![(
            "content-type".to_string(),
            self.protocol.content_type().to_string(),
        )];
        let body = match self.protocol {
            ClientProtocol::ConnectJson => {
                message.to_json().map_err(|e| ApiError::Encode(e.to_string()))?
            }
            ClientProtocol::ConnectProto => message.encode_to_vec(),
            ClientProtocol::GrpcWeb => envelope(0, &message.encode_to_vec()),
        };
        match self.protocol {
            ClientProtocol::ConnectJson | ClientProtocol::ConnectProto => {
                headers.push(("connect-protocol-version".to_string(), "1".to_string()));
                if let Some(timeout) = self.timeout {
                    headers.push(("connect-timeout-ms".to_string(), timeout.as_millis().to_string()));
                }
            }
            ClientProtocol::GrpcWeb => {
                headers.push(("x-grpc-web".to_string(), "1".to_string()));
                if let Some(timeout) = self.timeout {
                    headers.push(("grpc-timeout".to_string(), format!("{}m", timeout.as_millis())));
                }
            }
        }
        Ok(HttpRequest {
            url: format!("{}{}", self.base_url, method.path()),
            headers,
            body,
        })
    }

    fn parse<M>(&self, response: HttpResponse) -> Result<M, ApiError>
    where
        M: Message + JsonMessage + Default,
    {
        match self.protocol {
            ClientProtocol::ConnectJson => {
                check_connect_status(&response)?;
                if response.body.is_empty() {
                    return Ok(M::default());
                }
                M::from_json(&response.body).map_err(|e| ApiError::Decode(e.to_string()))
            }
            ClientProtocol::ConnectProto => {
                check_connect_status(&response)?;
                M::decode(response.body.as_slice()).map_err(|e| ApiError::Decode(e.to_string()))
            }
            ClientProtocol::GrpcWeb => parse_grpc_web(response),
        }
    }
}

fn required_item(item: Option<todo_proto::ToDoItem>) -> Result<Todo, ApiError> {
    item.ok_or_else(|| ApiError::Decode("response carries no item".into()))
        .and_then(Todo::try_from)
}

/// Connect's JSON error body.
#[derive(Debug, Deserialize)]
struct ConnectError {
    code: String,
    #[serde(default)]
    message: String,
}

/// Map a non-200 Connect response to the error it carries.
fn check_connect_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.status == 200 {
        return Ok(());
    }
    let (code, message) = match serde_json::from_slice::<ConnectError>(&response.body) {
        Ok(err) => (
            code_from_name(&err.code).unwrap_or(Code::Unknown),
            err.message,
        ),
        Err(_) => (code_from_http_status(response.status), String::new()),
    };
    Err(ApiError::from_status(code, message))
}

// ---------------------------------------------------------------------------
// gRPC-Web
// ---------------------------------------------------------------------------

const TRAILER_FLAG: u8 = 0x80;

fn envelope(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(5 + payload.len());
    out.push(flags);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Splits a buffered gRPC-Web body into `(flags, payload)` envelopes.
fn envelopes(mut body: &[u8]) -> Result<Vec<(u8, &[u8])>, ApiError> {
    let mut out = Vec::new();
    while !body.is_empty() {
        if body.len() < 5 {
            return Err(ApiError::Decode("truncated envelope header".into()));
        }
        let len = u32::from_be_bytes([body[1], body[2], body[3], body[4]]) as usize;
        let end = 5 + len;
        if body.len() < end {
            return Err(ApiError::Decode("truncated envelope".into()));
        }
        out.push((body[0], &body[5..end]));
        body = &body[end..];
    }
    Ok(out)
}

fn parse_grpc_web<M: Message + Default>(response: HttpResponse) -> Result<M, ApiError> {
    if response.status != 200 {
        return Err(ApiError::UnexpectedStatus {
            status: response.status,
        });
    }

    // trailers-only responses carry the status in the headers
    let mut status = response.header("grpc-status").map(str::to_string);
    let mut message = response.header("grpc-message").map(str::to_string);
    let mut payload = None;

    for (flags, data) in envelopes(&response.body)? {
        if flags & TRAILER_FLAG == 0 {
            payload = Some(data);
            continue;
        }
        let block = String::from_utf8_lossy(data);
        for line in block.split("\r\n") {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.trim().to_ascii_lowercase().as_str() {
                "grpc-status" => status = Some(value.trim().to_string()),
                "grpc-message" => message = Some(value.trim().to_string()),
                _ => {}
            }
        }
    }

    let Some(status) = status else {
        return Err(ApiError::UnexpectedStatus {
            status: response.status,
        });
    };
    let code = status
        .parse::<i32>()
        .map(Code::from)
        .unwrap_or(Code::Unknown);
    if code != Code::Ok {
        let message = message
            .map(|m| percent_decode_str(&m).decode_utf8_lossy().into_owned())
            .unwrap_or_default();
        return Err(ApiError::from_status(code, message));
    }
    M::decode(payload.unwrap_or_default()).map_err(|e| ApiError::Decode(e.to_string()))
}
