//! Default RPC client built on hyper's pooled HTTP client.

use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Request, Response, StatusCode};
use hyper::body::{Body as _, Incoming};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::dispatch::rpc::{RpcClient, RpcRequest, RpcResponse};
use crate::error::RpcError;
use crate::resilience::timeouts::{effective_timeout, with_timeout};

/// Forwards calls over HTTP/1.1 and buffers the worker's reply.
#[derive(Debug, Clone)]
pub struct HyperRpcClient {
    client: Client<HttpConnector, Body>,
    default_timeout: Duration,
    max_body_bytes: usize,
}

impl HyperRpcClient {
    pub fn new(default_timeout: Duration, max_body_bytes: usize) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            default_timeout,
            max_body_bytes,
        }
    }

    fn build_request(request: RpcRequest) -> Result<Request<Body>, RpcError> {
        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.target.as_str());

        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
            // The worker's authority comes from the target URI.
            headers.remove(header::HOST);
            if let Some(content_type) = request.content_type.as_deref() {
                let value = HeaderValue::from_str(content_type).map_err(|e| {
                    RpcError::InvalidRequest(format!("content type {content_type:?}: {e}"))
                })?;
                headers.insert(header::CONTENT_TYPE, value);
            }
        }

        builder
            .body(Body::from(request.body))
            .map_err(|e| RpcError::InvalidRequest(format!("{}: {}", request.target, e)))
    }

    async fn send(&self, request: Request<Body>) -> Result<RpcResponse, RpcError> {
        let response: Response<Incoming> = self
            .client
            .request(request)
            .await
            .map_err(|e| RpcError::Transport(e.to_string()))?;

        let (parts, body) = response.into_parts();
        let body = collect_limited(body, self.max_body_bytes).await?;

        Ok(RpcResponse::new(parts.status, parts.headers, body))
    }
}

/// Buffer a worker body, failing with [`RpcError::ResponseTooLarge`] once it
/// grows past `limit` bytes.
async fn collect_limited(mut body: Incoming, limit: usize) -> Result<Bytes, RpcError> {
    if body.size_hint().lower() > limit as u64 {
        return Err(RpcError::ResponseTooLarge(limit));
    }

    let mut buf = Vec::new();
    while let Some(frame) = std::future::poll_fn(|cx| Pin::new(&mut body).poll_frame(cx)).await {
        let frame = frame.map_err(|e| RpcError::Transport(e.to_string()))?;
        if let Ok(data) = frame.into_data() {
            if buf.len() + data.len() > limit {
                return Err(RpcError::ResponseTooLarge(limit));
            }
            buf.extend_from_slice(&data);
        }
    }
    Ok(Bytes::from(buf))
}

#[async_trait]
impl RpcClient for HyperRpcClient {
    async fn invoke(&self, request: RpcRequest) -> RpcResponse {
        let timeout = effective_timeout(request.timeout, self.default_timeout);
        let target = request.target.clone();

        let http_request = match Self::build_request(request) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(target = %target, error = %e, "Failed to build upstream request");
                return RpcResponse::from_error(StatusCode::INTERNAL_SERVER_ERROR, e);
            }
        };

        match with_timeout(timeout, self.send(http_request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e @ RpcError::ResponseTooLarge(_))) => {
                tracing::warn!(target = %target, error = %e, "Worker response too large");
                RpcResponse::from_error(StatusCode::BAD_GATEWAY, e)
            }
            Ok(Err(e)) => RpcResponse::from_error(StatusCode::BAD_GATEWAY, e),
            Err(e) => RpcResponse::from_error(StatusCode::GATEWAY_TIMEOUT, e),
        }
    }
}
