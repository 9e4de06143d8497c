//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the catch-all dispatch route
//! - Wire up middleware (request ID, tracing, inbound timeout)
//! - Bind server to listener and shut down gracefully

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
    routing::any,
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ProxyConfig;
use crate::dispatch::{DispatchHandler, HyperRpcClient};
use crate::error::SetupError;
use crate::http::{request, response};
use crate::lifecycle::signals::wait_for_shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: DispatchHandler,
    pub max_body_bytes: usize,
}

/// HTTP front end for the dispatch handler.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    handler: DispatchHandler,
}

impl HttpServer {
    /// Create a server forwarding over HTTP with the configured worker pool.
    pub fn new(config: ProxyConfig) -> Result<Self, SetupError> {
        let client = Arc::new(HyperRpcClient::new(
            Duration::from_secs(config.timeouts.upstream_secs),
            config.limits.max_body_bytes,
        ));
        let handler = DispatchHandler::from_config(&config.balancer, client)?;
        Ok(Self::with_handler(config, handler))
    }

    /// Create a server around an existing dispatch handler.
    pub fn with_handler(config: ProxyConfig, handler: DispatchHandler) -> Self {
        let state = AppState {
            handler: handler.clone(),
            max_body_bytes: config.limits.max_body_bytes,
        };
        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            handler,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// The router, for embedding or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// The dispatch handler behind this server.
    pub fn handler(&self) -> &DispatchHandler {
        &self.handler
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            workers = self.handler.pool().workers().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Catch-all handler: every request is dispatched to the worker pool.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let request_id = request::request_id(request.headers()).to_string();

    let dispatch = match request::into_dispatch_request(request, state.max_body_bytes).await {
        Ok(d) => d,
        Err(resp) => return resp,
    };

    tracing::debug!(
        request_id = %request_id,
        method = %dispatch.method,
        uri = %dispatch.uri,
        "Proxying request"
    );

    let result = state.handler.handle(dispatch).await;
    tracing::debug!(
        request_id = %request_id,
        status = %result.status,
        worker = ?result.worker,
        "Request completed"
    );
    response::into_response(result)
}
