//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → request.rs (buffer body, build DispatchRequest)
//!     → dispatch handler (pick worker, call, record outcome)
//!     → response.rs (status, headers, body back to client)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{X_REQUEST_ID, X_UPSTREAM_TIMEOUT_MS};
pub use server::{AppState, HttpServer};

use axum::http::{header, HeaderMap, HeaderName};

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::CONTENT_LENGTH,
    header::PROXY_AUTHENTICATE,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Drop connection-scoped and framing headers. Bodies are buffered and
/// re-framed on each hop.
pub(crate) fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    headers.remove("keep-alive");
    headers.remove("proxy-connection");
}
