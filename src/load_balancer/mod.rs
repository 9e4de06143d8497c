//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch request
//!     → pool.rs (lock shared state)
//!     → round_robin.rs (scan after cursor, skip open breakers)
//!     → worker.rs (compose target for the chosen worker)
//!     → unlock, call worker, lock again to record the outcome
//! ```
//!
//! # Design Decisions
//! - Worker registry is immutable after construction
//! - One mutex guards cursor and breaker records together
//! - Open breakers are excluded from selection

pub mod pool;
pub mod round_robin;
pub mod worker;

pub use pool::{Outcome, Selected, WorkerPool, WorkerStatus};
pub use worker::{Worker, WorkerSet};
