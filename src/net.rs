//! Network channel and shared-state seams.
//!
//! The orchestrator does not own a wire protocol. Each module instance
//! opens one bidirectional [`NetworkChannel`] and one [`StateScope`]
//! through a [`WallTransport`], both addressed by an [`InstanceKey`]: the
//! fingerprint of the region's extents plus the placement deadline.
//! Repeated placements of the same region/time pair therefore reuse the
//! same addressing.
//!
//! ## Rules
//! - Opening is fallible and surfaces as [`WallError::Session`].
//! - Closing is best-effort; failures are [`TeardownError`]s that the
//!   instance logs without blocking its own disposal.
//! - [`MemoryTransport`] is an in-process reference implementation used by
//!   tests and demos; a real deployment plugs in its own transport.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{TeardownError, WallError};
use crate::geometry::Polygon;

/// Addressing key for an instance's sessions.
///
/// `(geometry-fingerprint, deadline)` — stable for repeated placements of
/// the same region at the same time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstanceKey {
    /// Fingerprint of the region polygon's extents.
    pub geometry: String,
    /// Absolute deadline (ms) of the placement.
    pub deadline: u64,
}

impl InstanceKey {
    /// Builds the key for a region polygon and placement deadline.
    pub fn new(geometry: &Polygon, deadline: u64) -> Self {
        Self {
            geometry: geometry.extents().fingerprint(),
            deadline,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.geometry, self.deadline)
    }
}

/// An open bidirectional session for one module instance.
pub trait NetworkChannel: Send + Sync {
    /// The key this channel was opened with.
    fn key(&self) -> &InstanceKey;

    /// Sends a payload to the peer side of the wall.
    fn send(&self, payload: serde_json::Value);

    /// Closes the session. Called exactly once by instance disposal.
    fn close(&self) -> Result<(), TeardownError>;
}

/// A shared-state handle opened and closed in lockstep with the channel.
pub trait StateScope: Send + Sync {
    /// The key this scope was opened with.
    fn key(&self) -> &InstanceKey;

    /// Closes the scope. Called exactly once by instance disposal.
    fn close(&self) -> Result<(), TeardownError>;
}

/// Factory for per-instance sessions.
pub trait WallTransport: Send + Sync {
    /// Opens the network channel for `key`.
    fn open_channel(&self, key: InstanceKey) -> Result<Arc<dyn NetworkChannel>, WallError>;

    /// Opens the state scope for `key`.
    fn open_scope(&self, key: InstanceKey) -> Result<Arc<dyn StateScope>, WallError>;
}

/// In-process transport that only tracks which sessions are open.
///
/// Reference implementation for tests and demos: it performs no I/O, but
/// its bookkeeping lets a test assert that every opened session was closed
/// exactly once.
#[derive(Default)]
pub struct MemoryTransport {
    open: Arc<Mutex<HashMap<String, usize>>>,
    opened_total: Arc<Mutex<usize>>,
}

impl MemoryTransport {
    /// Creates a fresh transport with no open sessions.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of currently open sessions (channels + scopes).
    pub fn open_sessions(&self) -> usize {
        self.open.lock().unwrap().values().sum()
    }

    /// Total number of sessions ever opened.
    pub fn opened_total(&self) -> usize {
        *self.opened_total.lock().unwrap()
    }

    fn open_session(&self, label: String) {
        *self.open.lock().unwrap().entry(label).or_insert(0) += 1;
        *self.opened_total.lock().unwrap() += 1;
    }
}

struct MemorySession {
    key: InstanceKey,
    label: String,
    open: Arc<Mutex<HashMap<String, usize>>>,
    closed: AtomicBool,
}

impl MemorySession {
    fn close_once(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            let mut open = self.open.lock().unwrap();
            if let Some(count) = open.get_mut(&self.label) {
                *count -= 1;
                if *count == 0 {
                    open.remove(&self.label);
                }
            }
        }
    }
}

impl NetworkChannel for MemorySession {
    fn key(&self) -> &InstanceKey {
        &self.key
    }

    fn send(&self, _payload: serde_json::Value) {}

    fn close(&self) -> Result<(), TeardownError> {
        self.close_once();
        Ok(())
    }
}

impl StateScope for MemorySession {
    fn key(&self) -> &InstanceKey {
        &self.key
    }

    fn close(&self) -> Result<(), TeardownError> {
        self.close_once();
        Ok(())
    }
}

impl WallTransport for MemoryTransport {
    fn open_channel(&self, key: InstanceKey) -> Result<Arc<dyn NetworkChannel>, WallError> {
        let label = format!("channel:{key}");
        self.open_session(label.clone());
        Ok(Arc::new(MemorySession {
            key,
            label,
            open: Arc::clone(&self.open),
            closed: AtomicBool::new(false),
        }))
    }

    fn open_scope(&self, key: InstanceKey) -> Result<Arc<dyn StateScope>, WallError> {
        let label = format!("scope:{key}");
        self.open_session(label.clone());
        Ok(Arc::new(MemorySession {
            key,
            label,
            open: Arc::clone(&self.open),
            closed: AtomicBool::new(false),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sessions_are_tracked_and_close_is_idempotent() {
        let transport = MemoryTransport::new();
        let key = InstanceKey::new(&Polygon::rect(0.0, 0.0, 100.0, 100.0), 1000);

        let channel = transport.open_channel(key.clone()).unwrap();
        let scope = transport.open_scope(key.clone()).unwrap();
        assert_eq!(transport.open_sessions(), 2);
        assert_eq!(channel.key(), &key);

        scope.close().unwrap();
        channel.close().unwrap();
        channel.close().unwrap();
        assert_eq!(transport.open_sessions(), 0);
        assert_eq!(transport.opened_total(), 2);
    }

    #[test]
    fn same_region_and_deadline_share_addressing() {
        let poly = Polygon::rect(0.0, 0.0, 100.0, 100.0);
        let a = InstanceKey::new(&poly, 1000);
        let b = InstanceKey::new(&poly, 1000);
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0,0,100,100-1000");
    }
}
