//! # Module ticker: per-frame dispatch to animating instances.
//!
//! The ticker is the one registry shared by every region machine in a
//! process. Instances are added when their fade-in begins and removed when
//! they are retired; between those points they receive `tick(now, delta)`
//! callbacks each frame.
//!
//! ## Rules
//! - `add`/`remove` are idempotent set operations keyed by instance id;
//!   region machines never remove each other's entries.
//! - The ticker holds non-owning behavior handles: removing an instance
//!   never disposes it, and disposal removes the instance so a dangling
//!   callback target cannot survive.
//! - Dispatch clones the handles out of the lock, so a slow `tick` never
//!   blocks add/remove from other regions.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::clock::Clock;

use super::behavior::ModuleBehavior;

struct TickEntry {
    name: Arc<str>,
    behavior: Arc<dyn ModuleBehavior>,
}

struct Inner {
    entries: HashMap<u64, TickEntry>,
    last_tick: Option<u64>,
}

/// Registry of currently-animating module instances.
#[derive(Clone)]
pub struct ModuleTicker {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ModuleTicker {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleTicker {
    /// Creates an empty ticker.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: HashMap::new(),
                last_tick: None,
            })),
        }
    }

    /// Adds an instance's behavior under its id. Idempotent.
    pub fn add(&self, id: u64, name: Arc<str>, behavior: Arc<dyn ModuleBehavior>) {
        self.inner
            .lock()
            .unwrap()
            .entries
            .entry(id)
            .or_insert(TickEntry { name, behavior });
    }

    /// Removes an instance by id. Idempotent; never disposes.
    pub fn remove(&self, id: u64) {
        self.inner.lock().unwrap().entries.remove(&id);
    }

    /// Whether the instance is currently registered.
    pub fn contains(&self, id: u64) -> bool {
        self.inner.lock().unwrap().entries.contains_key(&id)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// True when nothing is animating.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }

    /// Dispatches one frame at clock reading `now`.
    ///
    /// Delta is measured from the previous `tick` call; the first frame
    /// after a quiet period reports a zero delta.
    pub fn tick(&self, now: u64) {
        let (behaviors, delta) = {
            let mut inner = self.inner.lock().unwrap();
            let delta = inner.last_tick.map_or(0, |last| now.saturating_sub(last));
            inner.last_tick = Some(now);
            let behaviors: Vec<(Arc<str>, Arc<dyn ModuleBehavior>)> = inner
                .entries
                .values()
                .map(|e| (Arc::clone(&e.name), Arc::clone(&e.behavior)))
                .collect();
            (behaviors, delta)
        };
        for (name, behavior) in behaviors {
            tracing::trace!(module = %name, now, delta, "tick");
            behavior.tick(now, delta);
        }
    }

    /// Drives frames at a fixed period until `token` is cancelled.
    pub async fn drive(&self, clock: Clock, period: Duration, token: CancellationToken) {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(period) => self.tick(clock.now()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Default)]
    struct Counting {
        ticks: AtomicU64,
        last_delta: AtomicU64,
    }

    impl ModuleBehavior for Counting {
        fn tick(&self, _now: u64, delta_ms: u64) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
            self.last_delta.store(delta_ms, Ordering::SeqCst);
        }
    }

    #[test]
    fn add_and_remove_are_idempotent() {
        let ticker = ModuleTicker::new();
        let behavior = Arc::new(Counting::default());
        ticker.add(1, "clock".into(), behavior.clone());
        ticker.add(1, "clock".into(), behavior.clone());
        assert_eq!(ticker.len(), 1);
        ticker.remove(1);
        ticker.remove(1);
        assert!(ticker.is_empty());
    }

    #[test]
    fn tick_reports_delta_between_frames() {
        let ticker = ModuleTicker::new();
        let behavior = Arc::new(Counting::default());
        ticker.add(7, "clock".into(), behavior.clone());

        ticker.tick(100);
        assert_eq!(behavior.last_delta.load(Ordering::SeqCst), 0);
        ticker.tick(116);
        assert_eq!(behavior.last_delta.load(Ordering::SeqCst), 16);
        assert_eq!(behavior.ticks.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn removed_instances_stop_receiving_frames() {
        let ticker = ModuleTicker::new();
        let behavior = Arc::new(Counting::default());
        ticker.add(7, "clock".into(), behavior.clone());
        ticker.tick(0);
        ticker.remove(7);
        ticker.tick(16);
        assert_eq!(behavior.ticks.load(Ordering::SeqCst), 1);
    }
}
