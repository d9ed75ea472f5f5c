use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock time for `saved_at` / `updated_at`.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Deterministic clock that advances by a fixed step on every reading.
#[derive(Debug)]
pub struct ManualClock {
    state: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self::ticking(start, Duration::zero())
    }

    pub fn ticking(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            state: Mutex::new(start),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.state.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let current = *now;
        *now += self.step;
        current
    }
}
