//! Time sources for the [`crate::ResolutionCache`].

use std::{
    fmt::Debug,
    sync::Mutex,
    time::{Duration, SystemTime},
};

/// Where the [`crate::ResolutionCache`] gets the current time from.
pub trait Clock: Debug + Send + Sync {
    /// The current time.
    fn now(&self) -> SystemTime;
}

/// A [`Clock`] backed by [`SystemTime::now()`].
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime { SystemTime::now() }
}

/// A [`Clock`] which only moves when it is told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<SystemTime>,
}

impl ManualClock {
    /// Create a new [`ManualClock`] frozen at `start`.
    pub fn new(start: SystemTime) -> Self {
        ManualClock {
            now: Mutex::new(start),
        }
    }

    /// Move the clock forwards.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().expect("Mutex was poisoned");
        *now += duration;
    }
}

impl Default for ManualClock {
    fn default() -> Self { ManualClock::new(SystemTime::UNIX_EPOCH) }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime { *self.now.lock().expect("Mutex was poisoned") }
}
