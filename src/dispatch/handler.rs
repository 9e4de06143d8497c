//! Dispatch handler.
//!
//! # Responsibilities
//! - Strip the configured path prefix from the request URI
//! - Pick a worker, call it, feed the outcome back to its breaker
//! - Return the worker's reply untouched
//!
//! # Design Decisions
//! - The pool lock is released before the outbound call
//! - Exactly one outbound call per dispatch, none when every worker is tripped
//! - Breaker bookkeeping never alters or suppresses the response

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};

use crate::config::BalancerConfig;
use crate::dispatch::rpc::{RpcClient, RpcRequest};
use crate::error::{DispatchError, SetupError};
use crate::load_balancer::{Outcome, WorkerPool, WorkerSet};
use crate::observability::metrics;
use crate::resilience::circuit_breaker::BreakerSettings;
use crate::resilience::clock::{Clock, SystemClock};

/// One inbound call to be dispatched.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Path and query as received, prefix not yet stripped.
    pub uri: String,
    pub content_type: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Forwarded to the RPC client; `None` or zero means its default.
    pub timeout: Option<Duration>,
}

impl DispatchRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self {
            method,
            uri: uri.into(),
            content_type: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }
}

/// The reply handed back to the caller.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub headers: HeaderMap,
    pub body: Bytes,
    pub status: StatusCode,
    pub error: Option<DispatchError>,
    /// Address of the worker that served the call, if any was picked.
    pub worker: Option<String>,
}

impl DispatchResponse {
    fn exhausted() -> Self {
        Self {
            headers: HeaderMap::new(),
            body: Bytes::new(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: Some(DispatchError::Exhausted),
            worker: None,
        }
    }
}

/// Round-robin dispatcher with a per-worker circuit breaker.
#[derive(Debug, Clone)]
pub struct DispatchHandler {
    pool: Arc<WorkerPool>,
    path_prefix: String,
    client: Arc<dyn RpcClient>,
    clock: Arc<dyn Clock>,
}

impl DispatchHandler {
    /// Build a handler from raw parameters, validating all of them eagerly.
    pub fn new<I, S>(
        workers: I,
        path_prefix: impl Into<String>,
        failure_limit: u32,
        window_secs: f64,
        client: Arc<dyn RpcClient>,
    ) -> Result<Self, SetupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let workers = WorkerSet::new(workers)?;
        let settings = BreakerSettings::new(failure_limit, window_secs)?;
        Ok(Self::with_pool(
            WorkerPool::new(workers, settings),
            path_prefix,
            client,
            Arc::new(SystemClock),
        ))
    }

    /// Build a handler from the `[balancer]` config section.
    pub fn from_config(config: &BalancerConfig, client: Arc<dyn RpcClient>) -> Result<Self, SetupError> {
        Self::new(
            config.workers.iter().cloned(),
            config.path_prefix.clone(),
            config.failure_limit,
            config.window_secs,
            client,
        )
    }

    /// Assemble a handler from an already validated pool.
    pub fn with_pool(
        pool: WorkerPool,
        path_prefix: impl Into<String>,
        client: Arc<dyn RpcClient>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            pool: Arc::new(pool),
            path_prefix: path_prefix.into(),
            client,
            clock,
        }
    }

    /// Swap the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    fn strip_prefix<'a>(&self, uri: &'a str) -> &'a str {
        uri.strip_prefix(self.path_prefix.as_str()).unwrap_or(uri)
    }

    /// Dispatch one request to the next eligible worker.
    pub async fn handle(&self, request: DispatchRequest) -> DispatchResponse {
        let now: Instant = self.clock.now();
        let uri = self.strip_prefix(&request.uri);

        let selected = match self.pool.pick(now) {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    method = %request.method,
                    uri = %request.uri,
                    error = %e,
                    "All workers tripped, rejecting request"
                );
                metrics::record_exhausted();
                return DispatchResponse::exhausted();
            }
        };

        let target = selected.worker.target(uri);
        tracing::debug!(
            method = %request.method,
            target = %target,
            worker = selected.index,
            "Dispatching request"
        );

        let started = Instant::now();
        let response = self
            .client
            .invoke(RpcRequest {
                method: request.method,
                target,
                content_type: request.content_type,
                headers: request.headers,
                body: request.body,
                timeout: request.timeout,
            })
            .await;

        let failed = response.is_failure();
        let address = selected.worker.address;
        metrics::record_dispatch(&address, response.status.as_u16(), started);

        if failed {
            tracing::warn!(
                worker = %address,
                status = %response.status,
                error = ?response.error,
                "Worker call failed"
            );
        } else {
            tracing::debug!(worker = %address, status = %response.status, "Worker call succeeded");
        }

        if self.pool.record_outcome(selected.index, now, failed) == Outcome::Tripped {
            tracing::warn!(
                worker = %address,
                failure_limit = self.pool.settings().failure_limit(),
                window = ?self.pool.settings().window(),
                "Circuit breaker tripped"
            );
            metrics::record_breaker_trip(&address);
        }

        DispatchResponse {
            headers: response.headers,
            body: response.body,
            status: response.status,
            error: response.error.map(DispatchError::Upstream),
            worker: Some(address),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::rpc::RpcResponse;
    use crate::error::RpcError;
    use crate::resilience::clock::ManualClock;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Fake client: records every target and fails for configured workers.
    #[derive(Debug, Default)]
    struct ScriptedClient {
        calls: Mutex<Vec<RpcRequest>>,
        failing: Mutex<HashSet<String>>,
    }

    impl ScriptedClient {
        fn fail(&self, prefix: &str) {
            self.failing.lock().unwrap().insert(prefix.to_string());
        }

        fn targets(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|r| r.target.clone()).collect()
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl RpcClient for ScriptedClient {
        async fn invoke(&self, request: RpcRequest) -> RpcResponse {
            let fails = self
                .failing
                .lock()
                .unwrap()
                .iter()
                .any(|p| request.target.starts_with(p.as_str()));
            self.calls.lock().unwrap().push(request);
            if fails {
                let mut resp = RpcResponse::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    HeaderMap::new(),
                    Bytes::from_static(b"boom"),
                );
                resp.error = Some(RpcError::Transport("worker error".into()));
                resp
            } else {
                RpcResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(b"ok"))
            }
        }
    }

    const APP1: &str = "http://localhost:8080/app1/";
    const APP2: &str = "http://localhost:8080/app2/";

    fn handler(limit: u32, window_secs: f64) -> (DispatchHandler, Arc<ScriptedClient>, Arc<ManualClock>) {
        let client = Arc::new(ScriptedClient::default());
        let clock = Arc::new(ManualClock::new());
        let handler = DispatchHandler::new(
            ["localhost:8080/app1/", "localhost:8080/app2/"],
            "/test/",
            limit,
            window_secs,
            client.clone(),
        )
        .unwrap()
        .with_clock(clock.clone());
        (handler, client, clock)
    }

    fn post(uri: &str) -> DispatchRequest {
        DispatchRequest::new(Method::POST, uri)
    }

    /// Runs `n` requests `gap_ms` apart, returning (worker, status) pairs.
    async fn run(
        handler: &DispatchHandler,
        clock: &ManualClock,
        n: usize,
        gap_ms: u64,
    ) -> Vec<(String, u16)> {
        let mut seen = Vec::new();
        for _ in 0..n {
            let resp = handler.handle(post("/test/halo")).await;
            let worker = match resp.worker.as_deref() {
                Some("localhost:8080/app1/") => "A",
                Some("localhost:8080/app2/") => "B",
                _ => "-",
            };
            seen.push((worker.to_string(), resp.status.as_u16()));
            clock.advance_ms(gap_ms);
        }
        seen
    }

    fn expect(pairs: &[(&str, u16)]) -> Vec<(String, u16)> {
        pairs.iter().map(|(w, s)| (w.to_string(), *s)).collect()
    }

    #[test]
    fn test_construction_is_validated() {
        let client: Arc<dyn RpcClient> = Arc::new(ScriptedClient::default());
        assert_eq!(
            DispatchHandler::new(Vec::<String>::new(), "", 1, 1.0, client.clone()).unwrap_err(),
            SetupError::NoWorkers
        );
        assert_eq!(
            DispatchHandler::new(["a:1"], "", 0, 1.0, client.clone()).unwrap_err(),
            SetupError::InvalidFailureLimit(0)
        );
        assert!(matches!(
            DispatchHandler::new(["a:1"], "", 1, 0.0, client).unwrap_err(),
            SetupError::InvalidWindow(_)
        ));
    }

    #[tokio::test]
    async fn test_prefix_stripped_and_target_composed() {
        let (handler, client, _) = handler(2, 0.03);
        handler.handle(post("/test/halo")).await;
        handler.handle(post("/other/path")).await;
        assert_eq!(
            client.targets(),
            vec![format!("{APP1}halo"), format!("{APP2}/other/path")]
        );
    }

    #[tokio::test]
    async fn test_request_fields_forwarded() {
        let (handler, client, _) = handler(2, 0.03);
        let mut req = post("/test/x");
        req.content_type = Some("application/json".into());
        req.headers.insert("x-id", "42".parse().unwrap());
        req.body = Bytes::from_static(b"{\"a\":1}");
        req.timeout = Some(Duration::from_millis(250));
        handler.handle(req).await;

        let calls = client.calls.lock().unwrap();
        let call = &calls[0];
        assert_eq!(call.method, Method::POST);
        assert_eq!(call.content_type.as_deref(), Some("application/json"));
        assert_eq!(call.headers["x-id"], "42");
        assert_eq!(call.body, Bytes::from_static(b"{\"a\":1}"));
        assert_eq!(call.timeout, Some(Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn test_response_passed_through_unchanged() {
        let (handler, client, _) = handler(5, 1.0);
        client.fail(APP1);

        let resp = handler.handle(post("/test/halo")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.body, Bytes::from_static(b"boom"));
        assert_eq!(
            resp.error,
            Some(DispatchError::Upstream(RpcError::Transport("worker error".into())))
        );

        let resp = handler.handle(post("/test/halo")).await;
        assert_eq!(resp.status, StatusCode::OK);
        assert_eq!(resp.body, Bytes::from_static(b"ok"));
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn test_all_tripped_makes_no_call() {
        let (handler, client, clock) = handler(1, 0.05);
        client.fail(APP1);
        client.fail(APP2);

        handler.handle(post("/test/a")).await;
        handler.handle(post("/test/b")).await;
        assert_eq!(client.call_count(), 2);

        clock.advance_ms(10);
        let resp = handler.handle(post("/test/c")).await;
        assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(resp.error, Some(DispatchError::Exhausted));
        assert_eq!(resp.error.unwrap().to_string(), "no workers available");
        assert!(resp.worker.is_none());
        assert_eq!(client.call_count(), 2);

        // Both windows expire; traffic resumes.
        clock.advance_ms(50);
        let resp = handler.handle(post("/test/d")).await;
        assert!(resp.worker.is_some());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_sparse_failures_never_trip() {
        let (handler, client, clock) = handler(2, 0.03);
        client.fail(APP1);
        client.fail(APP2);

        // Each worker fails once per 40ms, longer than the 30ms window.
        let seen = run(&handler, &clock, 6, 20).await;
        assert!(seen.iter().all(|(w, s)| w != "-" && *s == 500));
        assert_eq!(client.call_count(), 6);
    }

    #[tokio::test]
    async fn test_reference_scenario() {
        let (handler, client, clock) = handler(2, 0.03);

        // All workers healthy: strict alternation.
        let seen = run(&handler, &clock, 4, 10).await;
        assert_eq!(seen, expect(&[("A", 200), ("B", 200), ("A", 200), ("B", 200)]));

        // B fails with short gaps: trips after its second failure.
        client.fail(APP2);
        let seen = run(&handler, &clock, 6, 10).await;
        assert_eq!(
            seen,
            expect(&[
                ("A", 200),
                ("B", 500),
                ("A", 200),
                ("B", 500),
                ("A", 200),
                ("A", 200),
            ])
        );

        // Long gaps: B's counter resets before it can reach the limit.
        clock.advance_ms(30);
        let seen = run(&handler, &clock, 6, 20).await;
        assert_eq!(
            seen,
            expect(&[
                ("B", 500),
                ("A", 200),
                ("B", 500),
                ("A", 200),
                ("B", 500),
                ("A", 200),
            ])
        );
    }

    #[tokio::test]
    async fn test_concurrent_dispatch_keeps_counters_consistent() {
        let client = Arc::new(ScriptedClient::default());
        let handler = DispatchHandler::new(["a:1", "b:2", "c:3"], "", 3, 60.0, client.clone()).unwrap();

        let tasks: Vec<_> = (0..30)
            .map(|i| {
                let handler = handler.clone();
                tokio::spawn(async move { handler.handle(post(&format!("/r/{i}"))).await })
            })
            .collect();
        for t in tasks {
            assert_eq!(t.await.unwrap().status, StatusCode::OK);
        }

        assert_eq!(client.call_count(), 30);
        let snapshot = handler.pool().snapshot(handler.clock().now());
        assert!(snapshot.iter().all(|w| w.error_count == 0 && !w.tripped));
    }
}
