//! # Event bus for broadcasting monitoring records.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that lets
//! many region machines publish without blocking while any number of
//! monitoring sinks observe.
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: a single ring buffer stores recent events.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip
//!   the `n` oldest items.
//! - **No persistence**: events are dropped when nobody is subscribed,
//!   which is exactly the "absence of a monitor must not affect control
//!   flow" contract.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for machine events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); every region
/// machine in a process shares one bus.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, _rx) = broadcast::channel::<Event>(capacity);
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers the event is dropped; publishing still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing subsequent events.
    ///
    /// Each call creates an independent receiver that only sees events
    /// sent after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
