//! Timeout enforcement.
//!
//! # Responsibilities
//! - Resolve the per-call deadline (zero or absent means "use the default")
//! - Wrap worker calls with that deadline
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities
//! - Timeout errors are distinct from transport errors
//! - Timed-out calls map to 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::error::RpcError;

/// Pick the deadline for one call.
pub fn effective_timeout(requested: Option<Duration>, default: Duration) -> Duration {
    match requested {
        Some(t) if !t.is_zero() => t,
        _ => default,
    }
}

/// Run `fut` under `timeout`, turning expiry into [`RpcError::Timeout`].
pub async fn with_timeout<F, T>(timeout: Duration, fut: F) -> Result<T, RpcError>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RpcError::Timeout(timeout))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_timeout() {
        let default = Duration::from_secs(10);
        assert_eq!(effective_timeout(None, default), default);
        assert_eq!(effective_timeout(Some(Duration::ZERO), default), default);
        assert_eq!(
            effective_timeout(Some(Duration::from_millis(250)), default),
            Duration::from_millis(250)
        );
    }

    #[tokio::test]
    async fn test_with_timeout_expires() {
        let res = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
        })
        .await;
        assert_eq!(res, Err(RpcError::Timeout(Duration::from_millis(10))));

        let ok = with_timeout(Duration::from_secs(1), async { 7 }).await;
        assert_eq!(ok, Ok(7));
    }
}
