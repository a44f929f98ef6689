//! # Transition strategies between module instances.
//!
//! A [`Transition`] animates between an outgoing and an incoming
//! instance's containers over a window ending at an absolute deadline. The
//! default [`FadeTransition`] is an opacity cross-fade.
//!
//! The strategy waits a fixed `until(deadline)` and trusts the deadline
//! arithmetic; it does not wait for an animation-complete signal from the
//! rendering layer. Changing that would change the wall's timing contract.

use async_trait::async_trait;

use crate::clock::Clock;
use crate::modules::RunningModule;
use crate::stage::{ContainerId, Stage};

/// Pluggable algorithm animating between two instances' containers.
#[async_trait]
pub trait Transition: Send + Sync + 'static {
    /// Prepares an incoming container before its module is shown:
    /// attaches it to the document, nearly invisible.
    fn prepare(&self, stage: &Stage, container: ContainerId);

    /// Animates from `outgoing` to `incoming`, resolving once
    /// `until(deadline)` has elapsed.
    async fn perform(
        &self,
        outgoing: &RunningModule,
        incoming: &RunningModule,
        clock: Clock,
        stage: &Stage,
        deadline: u64,
    );
}

/// Default opacity cross-fade.
pub struct FadeTransition;

#[async_trait]
impl Transition for FadeTransition {
    fn prepare(&self, stage: &Stage, container: ContainerId) {
        stage.attach(container, 0.001);
    }

    async fn perform(
        &self,
        outgoing: &RunningModule,
        incoming: &RunningModule,
        clock: Clock,
        stage: &Stage,
        deadline: u64,
    ) {
        let window = clock.until(deadline);
        // Fading to the blank module means fading *out* the *old*
        // container; otherwise fade the new container in.
        let target = if incoming.descriptor().is_empty() {
            outgoing.container().map(|c| (c, 0.0))
        } else {
            incoming.container().map(|c| (c, 1.0))
        };
        if let Some((container, opacity)) = target {
            stage.begin_fade(container, opacity, window);
        }
        clock.sleep_until(deadline).await;
        if let Some((container, _)) = target {
            stage.finish_fade(container);
        }
    }
}
