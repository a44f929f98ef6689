//! # Deadline clock.
//!
//! All scheduling in the crate is expressed against one monotonic
//! millisecond clock: the scheduler hands out absolute deadlines, and
//! every timer is armed as "sleep until deadline D", never "sleep for N
//! ms". Readings never go backwards, and a deadline already in the past
//! yields a zero wait rather than an error.
//!
//! [`Clock`] is a thin `Copy` wrapper over the tokio instant the process
//! started at, so it pauses and auto-advances with the test runtime.

use std::time::Duration;

use tokio::time::Instant;

/// Monotonic millisecond clock shared by every region machine.
#[derive(Clone, Copy, Debug)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    /// Starts a clock reading zero now.
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Current reading in milliseconds since the clock started.
    pub fn now(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    /// Absolute deadline `ms` milliseconds from now.
    pub fn in_future(&self, ms: u64) -> u64 {
        self.now() + ms
    }

    /// Time remaining until `deadline`, clamped to zero when the deadline
    /// has already passed.
    pub fn until(&self, deadline: u64) -> Duration {
        Duration::from_millis(deadline.saturating_sub(self.now()))
    }

    /// Sleeps until the absolute `deadline`; returns immediately if it
    /// has already passed.
    pub async fn sleep_until(&self, deadline: u64) {
        tokio::time::sleep_until(self.origin + Duration::from_millis(deadline)).await;
    }
}
