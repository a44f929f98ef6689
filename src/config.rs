//! # Global wall configuration.
//!
//! [`WallConfig`] centralizes the runtime settings shared by every region
//! machine in a process: the visual transition duration and the monitoring
//! bus capacity.
//!
//! ## Field semantics
//! - `transition`: the fixed length of the cross-fade window. The fade
//!   starts exactly at a request's deadline and ends `transition` later,
//!   regardless of how long preparation took.
//! - `bus_capacity`: ring buffer size of the monitoring event bus (min 1,
//!   clamped by the bus).

use std::time::Duration;

/// Configuration for a wall process.
#[derive(Clone, Debug)]
pub struct WallConfig {
    /// Duration of the visual cross-fade between modules.
    ///
    /// Decouples "how long did loading take" from "how long does the fade
    /// look": every region fades over the same fixed window so the whole
    /// wall changes in lockstep.
    pub transition: Duration,

    /// Capacity of the monitoring bus ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` events
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl WallConfig {
    /// Transition duration in whole milliseconds, the unit deadlines use.
    #[inline]
    pub fn transition_ms(&self) -> u64 {
        self.transition.as_millis() as u64
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for WallConfig {
    /// Default configuration:
    ///
    /// - `transition = 5s` (the wall's standard cross-fade window)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            transition: Duration::from_secs(5),
            bus_capacity: 1024,
        }
    }
}
