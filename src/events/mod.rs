//! Monitoring events: types and broadcast bus.
//!
//! Every orchestration machine publishes a timestamped record on every
//! state transition and every external request it receives. A monitoring
//! sink subscribes to the [`Bus`] to observe them; the absence of any
//! subscriber never affects control flow.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] — event classification and payload metadata
//! - [`Bus`] — thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: each region's `Machine` driver.
//! - **Consumers**: monitoring sinks (dashboards, log writers, tests).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
