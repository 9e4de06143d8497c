//! Per-worker circuit breaker.
//!
//! # States
//! - Closed: worker eligible, consecutive failures accumulate
//! - Open: worker skipped until `trip_until` has passed
//!
//! # State Transitions
//! ```text
//! Closed → Open: error_count reaches failure_limit on a failing outcome
//! Open → Closed: now > trip_until (no event, evaluated on selection)
//! ```
//!
//! # Design Decisions
//! - Eligibility is a pure function of `(now, trip_until)`; there is no
//!   state enum to keep in sync
//! - Failures older than one window are forgotten (sliding reset)
//! - Successes never close an open breaker early

use std::time::{Duration, Instant};

use crate::error::SetupError;

/// Breaker tuning shared by every worker in a pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSettings {
    failure_limit: u32,
    window: Duration,
}

impl BreakerSettings {
    /// Validate and build breaker settings.
    ///
    /// `window_secs` is both the trip duration and the sliding reset window.
    pub fn new(failure_limit: u32, window_secs: f64) -> Result<Self, SetupError> {
        if !window_secs.is_finite() || window_secs <= 0.0 {
            return Err(SetupError::InvalidWindow(window_secs));
        }
        let window = Duration::try_from_secs_f64(window_secs)
            .map_err(|_| SetupError::InvalidWindow(window_secs))?;
        if window.is_zero() {
            return Err(SetupError::InvalidWindow(window_secs));
        }
        Self::with_window(failure_limit, window)
    }

    /// Build settings from an exact window duration.
    pub fn with_window(failure_limit: u32, window: Duration) -> Result<Self, SetupError> {
        if failure_limit < 1 {
            return Err(SetupError::InvalidFailureLimit(failure_limit));
        }
        if window.is_zero() {
            return Err(SetupError::InvalidWindow(0.0));
        }
        Ok(Self {
            failure_limit,
            window,
        })
    }

    pub fn failure_limit(&self) -> u32 {
        self.failure_limit
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

/// Mutable breaker bookkeeping for one worker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BreakerRecord {
    error_count: u32,
    /// `None` is the infinitely-past deadline.
    trip_until: Option<Instant>,
    /// `None` until the worker is first dispatched to.
    last_attempt: Option<Instant>,
}

impl BreakerRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn trip_until(&self) -> Option<Instant> {
        self.trip_until
    }

    pub fn last_attempt(&self) -> Option<Instant> {
        self.last_attempt
    }

    /// Forget accumulated failures once a full window has passed since the
    /// last attempt.
    pub fn expire_stale_failures(&mut self, now: Instant, settings: &BreakerSettings) {
        let stale = match self.last_attempt {
            Some(last) => now.saturating_duration_since(last) >= settings.window,
            None => true,
        };
        if stale {
            self.error_count = 0;
        }
    }

    /// True iff `now` is strictly after the trip deadline.
    pub fn is_eligible(&self, now: Instant) -> bool {
        match self.trip_until {
            Some(until) => now > until,
            None => true,
        }
    }

    /// Time left until the breaker closes again, if it is open at `now`.
    pub fn remaining_trip(&self, now: Instant) -> Option<Duration> {
        match self.trip_until {
            Some(until) if now <= until => Some(until - now),
            _ => None,
        }
    }

    /// Stamp a dispatch attempt. Never moves `last_attempt` backwards, so a
    /// slow request finishing late cannot undo a newer selection.
    pub fn mark_attempt(&mut self, now: Instant) {
        self.last_attempt = Some(match self.last_attempt {
            Some(last) if last > now => last,
            _ => now,
        });
    }

    /// Feed the outcome of a dispatch back into the breaker.
    ///
    /// Returns `true` when this outcome tripped the breaker.
    pub fn record_outcome(&mut self, now: Instant, failed: bool, settings: &BreakerSettings) -> bool {
        self.mark_attempt(now);
        if !failed {
            return false;
        }

        self.error_count += 1;
        if self.error_count >= settings.failure_limit {
            self.trip_until = Some(now + settings.window);
            self.error_count = 0;
            return true;
        }
        false
    }
}
