//! # Stage: the document of drawable surfaces.
//!
//! Each module instance exclusively owns one container on the [`Stage`].
//! Containers are created detached and nearly invisible; the transition
//! strategy attaches them and animates their opacity. Removal is
//! idempotent so a disposed instance can never double-free its surface.
//!
//! The stage is deliberately renderer-agnostic: it records what a renderer
//! would need (attachment, opacity, an in-flight fade) without defining a
//! rendering API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Handle to a container on the stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContainerId(u64);

/// An in-flight opacity fade.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fade {
    /// Opacity the fade ends at.
    pub target: f64,
    /// Length of the fade window.
    pub duration: Duration,
}

/// One module's drawable surface.
#[derive(Clone, Debug)]
pub struct Container {
    /// Name of the module the container belongs to.
    pub module: String,
    /// Clock reading (ms) at creation; part of the container's identity.
    pub created_at: u64,
    /// Whether the container is attached to the visible document.
    pub attached: bool,
    /// Current opacity in `[0, 1]`.
    pub opacity: f64,
    /// Fade in progress, if any.
    pub fade: Option<Fade>,
}

/// Registry of containers for one wall process.
#[derive(Debug, Default)]
pub struct Stage {
    containers: Mutex<HashMap<ContainerId, Container>>,
    next_id: AtomicU64,
}

impl Stage {
    /// Creates an empty stage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a detached, fully opaque container for `module`.
    pub fn create(&self, module: &str, now: u64) -> ContainerId {
        let id = ContainerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.containers.lock().unwrap().insert(
            id,
            Container {
                module: module.to_string(),
                created_at: now,
                attached: false,
                opacity: 1.0,
                fade: None,
            },
        );
        id
    }

    /// Attaches a container to the visible document at the given opacity.
    pub fn attach(&self, id: ContainerId, opacity: f64) {
        if let Some(c) = self.containers.lock().unwrap().get_mut(&id) {
            c.attached = true;
            c.opacity = opacity;
        }
    }

    /// Records the start of an opacity fade on a container.
    pub fn begin_fade(&self, id: ContainerId, target: f64, duration: Duration) {
        if let Some(c) = self.containers.lock().unwrap().get_mut(&id) {
            c.fade = Some(Fade { target, duration });
        }
    }

    /// Completes a fade: snaps opacity to the target and clears the record.
    pub fn finish_fade(&self, id: ContainerId) {
        if let Some(c) = self.containers.lock().unwrap().get_mut(&id) {
            if let Some(fade) = c.fade.take() {
                c.opacity = fade.target;
            }
        }
    }

    /// Removes a container. Idempotent.
    pub fn remove(&self, id: ContainerId) {
        self.containers.lock().unwrap().remove(&id);
    }

    /// Snapshot of a container, if it still exists.
    pub fn get(&self, id: ContainerId) -> Option<Container> {
        self.containers.lock().unwrap().get(&id).cloned()
    }

    /// Number of containers currently on the stage.
    pub fn len(&self) -> usize {
        self.containers.lock().unwrap().len()
    }

    /// True when the stage holds no containers.
    pub fn is_empty(&self) -> bool {
        self.containers.lock().unwrap().is_empty()
    }
}
