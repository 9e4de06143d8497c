//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to worker:
//!     → clock.rs (capture dispatch instant)
//!     → timeouts.rs (resolve the deadline handed to the RPC client)
//!     → circuit_breaker.rs (track failures, open breaker at the limit)
//! ```
//!
//! # Design Decisions
//! - Every outbound call has a deadline
//! - No retries: failures surface to the caller unchanged
//! - Circuit breaker prevents cascading failures

pub mod circuit_breaker;
pub mod clock;
pub mod timeouts;
