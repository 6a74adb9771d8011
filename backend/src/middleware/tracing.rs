//! Request tracing middleware

use axum::{extract::Request, http::HeaderMap, middleware::Next, response::Response};
use std::time::Instant;
use uuid::Uuid;

fn client_ip(headers: &HeaderMap) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(|s| s.trim().to_string());

    forwarded.or_else(|| {
        headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
    })
}

/// Logs each request on arrival and on completion with its latency
pub async fn request_tracing(request: Request, next: Next) -> Response {
    let request_id = Uuid::new_v4();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client_ip = client_ip(request.headers());
    let start = Instant::now();

    tracing::info!(%request_id, %method, %path, client_ip = ?client_ip, "Request started");

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = start.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        tracing::error!(%request_id, %method, %path, status, duration_ms, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%request_id, %method, %path, status, duration_ms, "Request rejected");
    } else {
        tracing::info!(%request_id, %method, %path, status, duration_ms, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_client_ip_prefers_first_forwarded_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("10.0.0.9"));
        assert_eq!(client_ip(&headers).as_deref(), Some("10.0.0.9"));

        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        assert_eq!(client_ip(&headers).as_deref(), Some("203.0.113.7"));
    }
}
