//! Worker pool management.
//!
//! # Responsibilities
//! - Own the worker registry, breaker records and selection cursor
//! - Serialize every read-modify-write of that state behind one mutex
//! - Never hold the mutex across I/O: callers pick, unlock, call, then record

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::error::DispatchError;
use crate::load_balancer::{round_robin::RoundRobin, worker::{Worker, WorkerSet}};
use crate::resilience::circuit_breaker::{BreakerRecord, BreakerSettings};

/// State guarded by the pool mutex.
#[derive(Debug)]
struct PoolState {
    selector: RoundRobin,
    records: Vec<BreakerRecord>,
}

/// A worker chosen for one dispatch.
#[derive(Debug, Clone)]
pub struct Selected {
    pub index: usize,
    pub worker: Worker,
}

/// Result of feeding an outcome back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Recorded,
    Tripped,
}

/// Point-in-time view of one worker's breaker.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerStatus {
    pub index: usize,
    pub address: String,
    pub error_count: u32,
    pub tripped: bool,
    /// Milliseconds until the worker is eligible again (0 when closed).
    pub trip_remaining_ms: u64,
}

/// Round-robin pool with a per-worker circuit breaker.
#[derive(Debug)]
pub struct WorkerPool {
    workers: WorkerSet,
    settings: BreakerSettings,
    state: Mutex<PoolState>,
}

impl WorkerPool {
    /// Create a pool; every worker starts closed with no failures.
    pub fn new(workers: WorkerSet, settings: BreakerSettings) -> Self {
        let records = vec![BreakerRecord::new(); workers.len()];
        Self {
            workers,
            settings,
            state: Mutex::new(PoolState {
                selector: RoundRobin::new(),
                records,
            }),
        }
    }

    pub fn workers(&self) -> &WorkerSet {
        &self.workers
    }

    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    // Every statement under the lock leaves the state consistent, so a
    // poisoned mutex is safe to keep using.
    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Select the next eligible worker at `now`.
    pub fn pick(&self, now: Instant) -> Result<Selected, DispatchError> {
        let index = {
            let mut state = self.lock();
            let PoolState { selector, records } = &mut *state;
            selector.pick(records, now, &self.settings)
        };

        match index.and_then(|i| self.workers.get(i).map(|w| (i, w))) {
            Some((index, worker)) => Ok(Selected {
                index,
                worker: worker.clone(),
            }),
            None => Err(DispatchError::Exhausted),
        }
    }

    /// Record the outcome of a dispatch to worker `index`, started at `now`.
    pub fn record_outcome(&self, index: usize, now: Instant, failed: bool) -> Outcome {
        let mut state = self.lock();
        let Some(record) = state.records.get_mut(index) else {
            return Outcome::Recorded;
        };
        if record.record_outcome(now, failed, &self.settings) {
            Outcome::Tripped
        } else {
            Outcome::Recorded
        }
    }

    /// Snapshot every worker's breaker without mutating it.
    pub fn snapshot(&self, now: Instant) -> Vec<WorkerStatus> {
        let state = self.lock();
        self.workers
            .iter()
            .zip(state.records.iter())
            .enumerate()
            .map(|(index, (worker, record))| {
                let remaining = record.remaining_trip(now);
                WorkerStatus {
                    index,
                    address: worker.address.clone(),
                    error_count: record.error_count(),
                    tripped: remaining.is_some(),
                    trip_remaining_ms: remaining
                        .unwrap_or(Duration::ZERO)
                        .as_millis()
                        .try_into()
                        .unwrap_or(u64::MAX),
                }
            })
            .collect()
    }

    /// Number of workers eligible at `now`.
    pub fn eligible_count(&self, now: Instant) -> usize {
        let state = self.lock();
        state.records.iter().filter(|r| r.is_eligible(now)).count()
    }
}
