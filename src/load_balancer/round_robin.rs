//! Round-robin selection over breaker-guarded workers.

use std::time::Instant;

use crate::resilience::circuit_breaker::{BreakerRecord, BreakerSettings};

/// Round-robin selector.
/// Remembers the last chosen index and resumes scanning after it.
#[derive(Debug, Default)]
pub struct RoundRobin {
    /// `None` until the first pick, so the first worker chosen is index 0.
    cursor: Option<usize>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the last chosen worker, if any.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Choose the next eligible worker.
    ///
    /// Visits up to `len + 1` candidates starting after the cursor. Every
    /// candidate visited has its stale failures expired before its
    /// eligibility is tested. The chosen worker becomes the new cursor and is
    /// stamped with `now`. Each visit advances the cursor, so when nothing is
    /// eligible it ends one past where it started and `None` is returned.
    pub fn pick(
        &mut self,
        records: &mut [BreakerRecord],
        now: Instant,
        settings: &BreakerSettings,
    ) -> Option<usize> {
        let len = records.len();
        if len == 0 {
            return None;
        }

        let start = self.cursor.map_or(0, |c| (c + 1) % len);
        for step in 0..=len {
            let index = (start + step) % len;
            let record = &mut records[index];
            record.expire_stale_failures(now, settings);
            if record.is_eligible(now) {
                record.mark_attempt(now);
                self.cursor = Some(index);
                return Some(index);
            }
        }

        // The last candidate visited was `start` again.
        self.cursor = Some((start + len) % len);
        None
    }
}
