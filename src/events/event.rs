//! # Monitoring records emitted by region machines.
//!
//! [`EventKind`] classifies what happened; [`Event`] carries the metadata a
//! monitoring sink needs to reconstruct a region's timeline: the wall clock
//! reading, the state name, the module name, and the deadline the action
//! was scheduled against.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore exact order when events from several
//! regions interleave.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of machine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The machine entered a new state.
    ///
    /// Sets: `state`, `region`, `deadline` (when the state has one).
    StateEntered,

    /// The scheduler asked for a new module on this region.
    ///
    /// Sets: `module`, `deadline`, `region`.
    NextModuleRequested,

    /// The scheduler asked the region to stop.
    ///
    /// Sets: `deadline`, `region`.
    StopRequested,

    /// Preparation overran its deadline; the machine forced a transition
    /// anyway. A designed fallback, not a failure.
    ///
    /// Sets: `module`, `deadline`, `region`.
    PreparationTimeout,

    /// The visual cross-fade began.
    ///
    /// Sets: `module`, `deadline`, `region`.
    FadeStarted,

    /// The cross-fade window closed and the outgoing instance was retired.
    ///
    /// Sets: `module`, `deadline`, `region`.
    FadeFinished,

    /// An error reached the machine and it is quiescing into the sink
    /// state.
    ///
    /// Sets: `reason`, `region`.
    ErrorRaised,

    /// The machine was externally restarted out of the error sink.
    ///
    /// Sets: `region`.
    MachineRestarted,
}

/// A machine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall clock reading in milliseconds when the event was created
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Monotonic wall-clock reading (ms) at creation.
    pub at: u64,
    /// Event classification.
    pub kind: EventKind,
    /// Region label (geometry fingerprint), if applicable.
    pub region: Option<Arc<str>>,
    /// Machine state name, if applicable.
    pub state: Option<&'static str>,
    /// Module name, if applicable.
    pub module: Option<Arc<str>>,
    /// Deadline the action was scheduled against, if applicable.
    pub deadline: Option<u64>,
    /// Human-readable reason (errors, timeout details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind at clock reading `at`.
    pub fn at(kind: EventKind, at: u64) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at,
            kind,
            region: None,
            state: None,
            module: None,
            deadline: None,
            reason: None,
        }
    }

    /// Attaches the region label.
    #[inline]
    pub fn with_region(mut self, region: impl Into<Arc<str>>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Attaches a machine state name.
    #[inline]
    pub fn with_state(mut self, state: &'static str) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a module name.
    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches the deadline being acted on.
    #[inline]
    pub fn with_deadline(mut self, deadline: u64) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::at(EventKind::StateEntered, 0);
        let b = Event::at(EventKind::StateEntered, 0);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn builders_attach_metadata() {
        let ev = Event::at(EventKind::NextModuleRequested, 42)
            .with_module("clock")
            .with_deadline(1000)
            .with_region("0,0,1920,1080");
        assert_eq!(ev.at, 42);
        assert_eq!(ev.module.as_deref(), Some("clock"));
        assert_eq!(ev.deadline, Some(1000));
        assert_eq!(ev.region.as_deref(), Some("0,0,1920,1080"));
    }
}
