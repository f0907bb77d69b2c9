//! Per-call deadline threaded from the transport into every store call.
//!
//! # Design
//! Cancellation needs no token: when a caller disconnects, hyper drops the
//! handler future and with it any in-flight store future. Deadlines are the
//! part that must be carried explicitly, so [`CallContext`] holds one and
//! [`CallContext::run`] bounds a store future by it.

use std::future::Future;
use std::time::Duration;

use axum::http::HeaderMap;
use tokio::time::Instant;

use crate::error::StoreError;
use crate::wire::Wire;

pub const GRPC_TIMEOUT: &str = "grpc-timeout";
pub const CONNECT_TIMEOUT_MS: &str = "connect-timeout-ms";

/// Deadline of one inbound call. The default has no deadline.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    deadline: Option<Instant>,
}

impl CallContext {
    /// A context without deadline, for tests and background work.
    pub fn background() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Builds the context from the timeout header of `wire`: `grpc-timeout`
    /// for the gRPC family, `connect-timeout-ms` for Connect. `cap` is the
    /// server-side limit; the shorter of the two wins.
    pub fn from_headers(headers: &HeaderMap, wire: Wire, cap: Option<Duration>) -> Self {
        let requested = requested_timeout(headers, wire);
        let timeout = match (requested, cap) {
            (Some(requested), Some(cap)) => Some(requested.min(cap)),
            (requested, cap) => requested.or(cap),
        };
        timeout.map(Self::with_timeout).unwrap_or_default()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Runs `fut` unless the deadline has passed, failing with
    /// [`StoreError::DeadlineExceeded`] if it fires first.
    pub async fn run<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        let Some(deadline) = self.deadline else {
            return fut.await;
        };
        if Instant::now() >= deadline {
            return Err(StoreError::DeadlineExceeded);
        }
        tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| StoreError::DeadlineExceeded)?
    }
}

fn requested_timeout(headers: &HeaderMap, wire: Wire) -> Option<Duration> {
    let (name, parse): (&str, fn(&str) -> Option<Duration>) = match wire {
        Wire::Connect(_) => (CONNECT_TIMEOUT_MS, parse_connect_timeout),
        Wire::Grpc | Wire::GrpcWeb { .. } => (GRPC_TIMEOUT, parse_grpc_timeout),
    };
    headers.get(name).and_then(|v| v.to_str().ok()).and_then(parse)
}

/// Parses a `grpc-timeout` value: up to 8 ASCII digits and a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;
    let duration = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Parses a `connect-timeout-ms` value: up to 10 ASCII digits.
pub fn parse_connect_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() || value.len() > 10 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok().map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    use crate::wire::Codec;

    #[test]
    fn grpc_timeout_units() {
        assert_eq!(parse_grpc_timeout("1H"), Some(Duration::from_secs(3600)));
        assert_eq!(parse_grpc_timeout("2M"), Some(Duration::from_secs(120)));
        assert_eq!(parse_grpc_timeout("3S"), Some(Duration::from_secs(3)));
        assert_eq!(parse_grpc_timeout("250m"), Some(Duration::from_millis(250)));
        assert_eq!(parse_grpc_timeout("10u"), Some(Duration::from_micros(10)));
        assert_eq!(parse_grpc_timeout("99n"), Some(Duration::from_nanos(99)));
    }

    #[test]
    fn grpc_timeout_rejects_malformed_values() {
        assert_eq!(parse_grpc_timeout(""), None);
        assert_eq!(parse_grpc_timeout("S"), None);
        assert_eq!(parse_grpc_timeout("10"), None);
        assert_eq!(parse_grpc_timeout("10x"), None);
        assert_eq!(parse_grpc_timeout("-1S"), None);
        assert_eq!(parse_grpc_timeout("123456789S"), None);
    }

    #[test]
    fn connect_timeout_is_milliseconds() {
        assert_eq!(parse_connect_timeout("1500"), Some(Duration::from_millis(1500)));
        assert_eq!(parse_connect_timeout("abc"), None);
        assert_eq!(parse_connect_timeout("12345678901"), None);
    }

    #[test]
    fn server_cap_bounds_requested_timeout() {
        let mut headers = HeaderMap::new();
        headers.insert(GRPC_TIMEOUT, HeaderValue::from_static("1H"));
        let ctx = CallContext::from_headers(&headers, Wire::Grpc, Some(Duration::from_secs(5)));
        let remaining = ctx.deadline().unwrap() - Instant::now();
        assert!(remaining <= Duration::from_secs(5));

        let ctx = CallContext::from_headers(&HeaderMap::new(), Wire::Grpc, None);
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn connect_calls_read_only_the_connect_header() {
        let mut headers = HeaderMap::new();
        headers.insert(GRPC_TIMEOUT, HeaderValue::from_static("garbage"));
        headers.insert(CONNECT_TIMEOUT_MS, HeaderValue::from_static("2000"));

        let ctx = CallContext::from_headers(&headers, Wire::Connect(Codec::Json), None);
        let remaining = ctx.deadline().expect("connect-timeout-ms applies") - Instant::now();
        assert!(remaining > Duration::from_secs(1) && remaining <= Duration::from_secs(2));
    }

    #[test]
    fn grpc_calls_ignore_the_connect_header() {
        let mut headers = HeaderMap::new();
        headers.insert(CONNECT_TIMEOUT_MS, HeaderValue::from_static("10"));
        let ctx = CallContext::from_headers(&headers, Wire::GrpcWeb { text: false }, None);
        assert!(ctx.deadline().is_none());
    }

    #[tokio::test]
    async fn expired_deadline_skips_the_call() {
        let ctx = CallContext::with_deadline(Instant::now() - Duration::from_millis(1));
        let result = ctx.run(async { Ok::<_, StoreError>(1) }).await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn slow_call_hits_deadline() {
        let ctx = CallContext::with_timeout(Duration::from_millis(10));
        let result = ctx
            .run(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, StoreError>(())
            })
            .await;
        assert!(matches!(result, Err(StoreError::DeadlineExceeded)));
    }
}
