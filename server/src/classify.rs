//! Protocol classification of inbound requests.
//!
//! # Design
//! [`classify`] is a pure, total function from a header map to a closed set
//! of labels; missing or non-UTF-8 headers just yield `Unknown`. The
//! [`classify_request`] middleware runs it once per request, reports the
//! result to a [`ProtocolObserver`], stores the [`Classification`] in the
//! request extensions and forwards the request unchanged. Classification
//! never decides whether a request succeeds; dispatch looks at the content
//! type on its own.

use std::sync::{Arc, Mutex, PoisonError};

use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

pub const CONNECT_PROTOCOL_VERSION: &str = "connect-protocol-version";
pub const GRPC_MEDIA_TYPE: &str = "application/grpc";
pub const GRPC_WEB_MEDIA_TYPE: &str = "application/grpc-web";
pub const CONNECT_MEDIA_TOKEN: &str = "application/connect";

/// Primary label: which RPC protocol produced the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Protocol {
    /// Connect, identified by its protocol-version header.
    Connect { version: String },
    Grpc,
    GrpcWeb,
    Unknown,
}

impl Protocol {
    pub fn label(&self) -> &'static str {
        match self {
            Protocol::Connect { .. } => "connect",
            Protocol::Grpc => "grpc",
            Protocol::GrpcWeb => "grpc-web",
            Protocol::Unknown => "unknown",
        }
    }
}

/// Secondary label: the framing family the content type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// Any `application/grpc*` content type.
    Binary,
    /// A content type carrying the `application/connect` token.
    Connect,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub protocol: Protocol,
    pub framing: Option<Framing>,
    pub content_type: Option<String>,
}

pub fn classify(headers: &HeaderMap) -> Classification {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let protocol = if let Some(version) = headers.get(CONNECT_PROTOCOL_VERSION) {
        Protocol::Connect {
            version: String::from_utf8_lossy(version.as_bytes()).into_owned(),
        }
    } else {
        match content_type {
            Some(GRPC_MEDIA_TYPE) => Protocol::Grpc,
            Some(GRPC_WEB_MEDIA_TYPE) => Protocol::GrpcWeb,
            _ => Protocol::Unknown,
        }
    };

    let framing = match content_type {
        Some(ct) if ct.starts_with(GRPC_MEDIA_TYPE) => Some(Framing::Binary),
        Some(ct) if ct.contains(CONNECT_MEDIA_TOKEN) => Some(Framing::Connect),
        _ => None,
    };

    Classification {
        protocol,
        framing,
        content_type: content_type.map(str::to_string),
    }
}

/// Everything reported about one inbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    pub request_id: Uuid,
    pub classification: Classification,
    /// `HTTP/1.1`, `HTTP/2.0`, ...
    pub http_version: String,
    pub method: String,
    pub path: String,
}

/// Sink for request classifications.
pub trait ProtocolObserver: Send + Sync + 'static {
    fn observe(&self, record: &RequestRecord);
}

/// Emits one structured `tracing` event per request.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ProtocolObserver for TracingObserver {
    fn observe(&self, record: &RequestRecord) {
        let classification = &record.classification;
        let version = match &classification.protocol {
            Protocol::Connect { version } => Some(version.as_str()),
            _ => None,
        };
        info!(
            request_id = %record.request_id,
            protocol = classification.protocol.label(),
            protocol_version = version,
            framing = ?classification.framing,
            content_type = classification.content_type.as_deref(),
            http_version = %record.http_version,
            method = %record.method,
            path = %record.path,
            "classified request"
        );
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    records: Mutex<Vec<RequestRecord>>,
}

impl RecordingObserver {
    pub fn records(&self) -> Vec<RequestRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProtocolObserver for RecordingObserver {
    fn observe(&self, record: &RequestRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}

/// Middleware: classify, report, attach, forward.
pub async fn classify_request(
    State(observer): State<Arc<dyn ProtocolObserver>>,
    mut req: Request,
    next: Next,
) -> Response {
    let record = RequestRecord {
        request_id: Uuid::new_v4(),
        classification: classify(req.headers()),
        http_version: format!("{:?}", req.version()),
        method: req.method().to_string(),
        path: req.uri().path().to_string(),
    };
    observer.observe(&record);

    let span = info_span!(
        "rpc",
        request_id = %record.request_id,
        protocol = record.classification.protocol.label(),
        path = %record.path,
    );
    req.extensions_mut().insert(record.classification);
    next.run(req).instrument(span).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn version_header_wins_over_content_type() {
        let c = classify(&headers(&[
            (CONNECT_PROTOCOL_VERSION, "1"),
            ("content-type", "application/grpc"),
        ]));
        assert_eq!(
            c.protocol,
            Protocol::Connect {
                version: "1".into()
            }
        );
        assert_eq!(c.framing, Some(Framing::Binary));
    }

    #[test]
    fn exact_grpc_content_type() {
        let c = classify(&headers(&[("content-type", "application/grpc")]));
        assert_eq!(c.protocol, Protocol::Grpc);
        assert_eq!(c.framing, Some(Framing::Binary));
    }

    #[test]
    fn exact_grpc_web_content_type() {
        let c = classify(&headers(&[("content-type", "application/grpc-web")]));
        assert_eq!(c.protocol, Protocol::GrpcWeb);
        // grpc-web shares the application/grpc prefix
        assert_eq!(c.framing, Some(Framing::Binary));
    }

    #[test]
    fn suffixed_grpc_content_type_is_unknown_but_binary() {
        let c = classify(&headers(&[("content-type", "application/grpc+proto")]));
        assert_eq!(c.protocol, Protocol::Unknown);
        assert_eq!(c.framing, Some(Framing::Binary));
    }

    #[test]
    fn connect_streaming_content_type_without_version() {
        let c = classify(&headers(&[("content-type", "application/connect+proto")]));
        assert_eq!(c.protocol, Protocol::Unknown);
        assert_eq!(c.framing, Some(Framing::Connect));
    }

    #[test]
    fn no_headers_is_unknown() {
        let c = classify(&HeaderMap::new());
        assert_eq!(c.protocol, Protocol::Unknown);
        assert_eq!(c.framing, None);
        assert_eq!(c.content_type, None);
    }

    #[test]
    fn non_utf8_content_type_is_unknown() {
        let mut map = HeaderMap::new();
        map.insert(
            "content-type",
            HeaderValue::from_bytes(b"application/\xffgrpc").unwrap(),
        );
        let c = classify(&map);
        assert_eq!(c.protocol, Protocol::Unknown);
        assert_eq!(c.framing, None);
    }

    #[test]
    fn recording_observer_keeps_records() {
        let observer = RecordingObserver::default();
        let record = RequestRecord {
            request_id: Uuid::nil(),
            classification: classify(&HeaderMap::new()),
            http_version: "HTTP/1.1".into(),
            method: "POST".into(),
            path: "/x".into(),
        };
        observer.observe(&record);
        assert_eq!(observer.records(), vec![record]);
    }
}
