//! Inbound request conversion.
//!
//! # Responsibilities
//! - Buffer the request body (bounded)
//! - Extract path+query, content type and headers
//! - Read the optional per-request upstream deadline
//!
//! # Design Decisions
//! - Request ID is assigned by the layer stack before this runs
//! - Oversized bodies are rejected with 413 before any worker is picked

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::dispatch::DispatchRequest;
use crate::http::strip_hop_by_hop;

/// Header carrying the request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Optional caller-supplied deadline for the worker call, in milliseconds.
/// Consumed here and not forwarded.
pub const X_UPSTREAM_TIMEOUT_MS: &str = "x-upstream-timeout-ms";

/// Request ID of an inbound request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

fn upstream_timeout(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(X_UPSTREAM_TIMEOUT_MS)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Turn an inbound HTTP request into a dispatch request.
pub async fn into_dispatch_request(
    request: Request<Body>,
    max_body_bytes: usize,
) -> Result<DispatchRequest, Response> {
    let (mut parts, body) = request.into_parts();

    let body = match axum::body::to_bytes(body, max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(
                request_id = %request_id(&parts.headers),
                error = %e,
                "Failed to read request body"
            );
            return Err((StatusCode::PAYLOAD_TOO_LARGE, "Request body too large").into_response());
        }
    };

    let uri = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| "/".to_string());

    let content_type = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let timeout = upstream_timeout(&parts.headers);
    parts.headers.remove(X_UPSTREAM_TIMEOUT_MS);
    strip_hop_by_hop(&mut parts.headers);

    Ok(DispatchRequest {
        method: parts.method,
        uri,
        content_type,
        headers: parts.headers,
        body,
        timeout,
    })
}
