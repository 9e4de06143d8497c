//! RPC collaborator boundary.
//!
//! The dispatch handler never talks to the network itself. It hands a fully
//! composed [`RpcRequest`] to an [`RpcClient`] and treats the call as an
//! opaque, blocking operation with no internal retry.

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::error::RpcError;

/// One outbound call to a worker.
#[derive(Debug, Clone)]
pub struct RpcRequest {
    pub method: Method,
    /// Absolute target URL, e.g. `http://127.0.0.1:3000/api`.
    pub target: String,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// `None` or zero means "use the client's default".
    pub timeout: Option<Duration>,
}

/// What came back from a worker.
///
/// A response may carry both a status and an error; the handler passes both
/// through without converting one into the other.
#[derive(Debug, Clone)]
pub struct RpcResponse {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub status: StatusCode,
    pub error: Option<RpcError>,
}

impl RpcResponse {
    /// A response with no error.
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            headers,
            body,
            status,
            error: None,
        }
    }

    /// A response synthesized from a failed call.
    pub fn from_error(status: StatusCode, error: RpcError) -> Self {
        Self {
            headers: HeaderMap::new(),
            body: Bytes::new(),
            status,
            error: Some(error),
        }
    }

    /// Whether this outcome counts against the worker's breaker.
    pub fn is_failure(&self) -> bool {
        self.error.is_some() || self.status.is_server_error()
    }
}

/// Performs calls to workers.
#[async_trait]
pub trait RpcClient: Send + Sync + std::fmt::Debug {
    async fn invoke(&self, request: RpcRequest) -> RpcResponse;
}
