// Time sources for token issuance and expiry checks

use chrono::{Duration, NaiveDateTime, Timelike, Utc};
use std::sync::Mutex;

/// Source of "now" for the token lifecycle
pub trait Clock: Send + Sync {
    /// Current time, truncated to whole seconds
    fn now(&self) -> NaiveDateTime;
}

/// Wall clock in UTC
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        truncate(Utc::now().naive_utc())
    }
}

/// Manually driven clock for deterministic tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(truncate(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.lock() = truncate(now);
    }

    /// Move the clock by `seconds`; a step past the representable range is ignored
    pub fn advance(&self, seconds: i64) {
        let mut now = self.lock();
        if let Some(next) = Duration::try_seconds(seconds)
            .and_then(|step| now.checked_add_signed(step))
        {
            *now = next;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NaiveDateTime> {
        // A poisoned clock still holds a valid timestamp
        self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.lock()
    }
}

fn truncate(t: NaiveDateTime) -> NaiveDateTime {
    t.with_nanosecond(0).unwrap_or(t)
}
