use std::{
    sync::{PoisonError, RwLock},
    time::{Duration, SystemTime},
};

/// Source of "now" for lock-in and timestamp decisions.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> SystemTime;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Manually driven clock for simulations and tests.
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<SystemTime>,
}

impl FixedClock {
    /// Clock frozen at `now`.
    pub fn new(now: SystemTime) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    /// Jump to `now`.
    pub fn set(&self, now: SystemTime) {
        *self.now.write().unwrap_or_else(PoisonError::into_inner) = now;
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.write().unwrap_or_else(PoisonError::into_inner);
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        *self.now.read().unwrap_or_else(PoisonError::into_inner)
    }
}
