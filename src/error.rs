//! Error types shared across the balancer.

use std::time::Duration;
use thiserror::Error;

/// Invalid construction parameters. Raised once, when the pool or the
/// dispatch handler is built, and never afterwards.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SetupError {
    /// The worker list is empty.
    #[error("at least one worker address is required")]
    NoWorkers,

    /// A worker address does not form a valid `http://` URL.
    #[error("invalid worker address {address:?}: {reason}")]
    InvalidWorker { address: String, reason: String },

    /// The failure limit must be at least 1.
    #[error("failure limit must be >= 1, got {0}")]
    InvalidFailureLimit(u32),

    /// The breaker window must be a finite, positive number of seconds.
    #[error("breaker window must be > 0 seconds, got {0}")]
    InvalidWindow(f64),
}

/// Errors produced by the RPC collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Connection or protocol failure talking to the worker.
    #[error("transport error: {0}")]
    Transport(String),

    /// The call did not complete within its deadline.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// The worker's body exceeded the buffering limit (in bytes).
    #[error("upstream response body exceeds {0} bytes")]
    ResponseTooLarge(usize),

    /// The outbound request could not be built (bad target or header).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

/// Error attached to a dispatch response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Every worker is currently tripped.
    #[error("no workers available")]
    Exhausted,

    /// The collaborator reported an error; passed through untouched.
    #[error(transparent)]
    Upstream(#[from] RpcError),
}
