//! Outbound response conversion.
//!
//! # Responsibilities
//! - Turn a dispatch response into an HTTP response for the client
//! - Render dispatch errors when the worker supplied no body
//!
//! # Design Decisions
//! - Status and headers are the worker's, unchanged
//! - Hop-by-hop and framing headers are dropped since the body is re-framed

use axum::body::Body;
use axum::response::Response;

use crate::dispatch::DispatchResponse;
use crate::http::strip_hop_by_hop;

/// Build the client-facing response.
pub fn into_response(dispatch: DispatchResponse) -> Response {
    let DispatchResponse {
        mut headers,
        body,
        status,
        error,
        ..
    } = dispatch;

    strip_hop_by_hop(&mut headers);

    let body = match error {
        Some(e) if body.is_empty() => Body::from(e.to_string()),
        _ => Body::from(body),
    };

    let mut response = Response::new(body);
    *response.status_mut() = status;
    response.headers_mut().extend(headers);
    response
}
