//! # RunningModule: one attempted placement of a descriptor on a region.
//!
//! A `RunningModule` owns its container on the stage, its network channel,
//! and its state scope, and carries the loaded behavior once instantiation
//! resolves. The machine drives it through the lifecycle:
//!
//! ```text
//! created ─► instantiate ─► will_be_shown_soon ─► begin_transition_in
//!   ─► finish_transition_in ─► (display, ticks) ─► begin_transition_out
//!   ─► finish_transition_out ─► dispose
//! ```
//!
//! ## Rules
//! - The blank (`_empty`) instance short-circuits everything: only the
//!   container exists, every other call is a no-op.
//! - `will_be_shown_soon` / `begin_transition_in` failures dispose the
//!   instance before re-failing: a failing incoming module is abandoned,
//!   never shown.
//! - `dispose` is idempotent and safe on a half-instantiated instance:
//!   the live resources are *taken* out of the instance exactly once, so a
//!   second call finds nothing to release.
//! - An `instantiate` racing a prior `dispose` closes whatever it opened
//!   instead of resurrecting the instance.
//! - A fade-in requested while the behavior is still loading (a forced
//!   transition) is deferred: the instance joins the ticker and receives
//!   its hooks as soon as loading completes.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use crate::context::WallContext;
use crate::error::WallError;
use crate::geometry::Polygon;
use crate::library::ModuleDescriptor;
use crate::net::{InstanceKey, NetworkChannel, StateScope};
use crate::stage::ContainerId;

use super::behavior::{ModuleBehavior, ModuleEnv};
use super::title_card::TitleCard;

static INSTANCE_IDS: AtomicU64 = AtomicU64::new(1);

/// Resources owned while the instance is live.
struct Live {
    container: ContainerId,
    channel: Option<Arc<dyn NetworkChannel>>,
    scope: Option<Arc<dyn StateScope>>,
    behavior: Option<Arc<dyn ModuleBehavior>>,
    /// Fade-in deadline recorded while the behavior was still loading,
    /// delivered once loading completes.
    pending_fade_in: Option<u64>,
    /// Whether the fade-in window has already closed.
    finished_in: bool,
}

enum LiveState {
    /// Created, not yet instantiated.
    Pending,
    /// Instantiated; resources owned.
    Live(Live),
    /// Disposed; terminal.
    Disposed,
}

/// A stateful wrapper around one running (or about-to-run) module.
pub struct RunningModule {
    id: u64,
    ctx: Arc<WallContext>,
    descriptor: ModuleDescriptor,
    geometry: Polygon,
    deadline: u64,
    title_card: Arc<TitleCard>,
    live: Mutex<LiveState>,
}

impl RunningModule {
    /// Creates an instance for a descriptor placed on `geometry` with the
    /// given transition deadline.
    pub fn new(
        ctx: Arc<WallContext>,
        descriptor: ModuleDescriptor,
        geometry: Polygon,
        deadline: u64,
    ) -> Arc<Self> {
        let title_card = Arc::new(TitleCard::new(descriptor.credit().clone()));
        Arc::new(Self {
            id: INSTANCE_IDS.fetch_add(1, Ordering::Relaxed),
            ctx,
            descriptor,
            geometry,
            deadline,
            title_card,
            live: Mutex::new(LiveState::Pending),
        })
    }

    /// Creates the blank instance used before the first real module.
    pub fn empty(ctx: Arc<WallContext>) -> Arc<Self> {
        Self::new(ctx, ModuleDescriptor::empty(), Polygon::empty(), 0)
    }

    /// Unique instance id (ticker key).
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The descriptor this instance was created for.
    pub fn descriptor(&self) -> &ModuleDescriptor {
        &self.descriptor
    }

    /// The deadline this instance was placed against.
    pub fn deadline(&self) -> u64 {
        self.deadline
    }

    /// This instance's title card.
    pub fn title_card(&self) -> &Arc<TitleCard> {
        &self.title_card
    }

    /// The instance's container, while it is live.
    pub fn container(&self) -> Option<ContainerId> {
        match &*self.live.lock().unwrap() {
            LiveState::Live(l) => Some(l.container),
            _ => None,
        }
    }

    /// True once `dispose` has run.
    pub fn is_disposed(&self) -> bool {
        matches!(&*self.live.lock().unwrap(), LiveState::Disposed)
    }

    fn behavior(&self) -> Option<Arc<dyn ModuleBehavior>> {
        match &*self.live.lock().unwrap() {
            LiveState::Live(l) => l.behavior.clone(),
            _ => None,
        }
    }

    /// Constructs the container, opens the instance's sessions, and loads
    /// the module's behavior.
    ///
    /// On load failure the sessions are closed and nulled; the instance is
    /// left unusable and the caller must still `dispose()` it. The blank
    /// instance creates only its container.
    pub async fn instantiate(&self) -> Result<(), WallError> {
        let container = self
            .ctx
            .stage
            .create(self.descriptor.name(), self.ctx.clock.now());
        {
            let mut live = self.live.lock().unwrap();
            if matches!(&*live, LiveState::Disposed) {
                drop(live);
                self.ctx.stage.remove(container);
                return Ok(());
            }
            *live = LiveState::Live(Live {
                container,
                channel: None,
                scope: None,
                behavior: None,
                pending_fade_in: None,
                finished_in: false,
            });
        }
        if self.descriptor.is_empty() {
            return Ok(());
        }

        let key = InstanceKey::new(&self.geometry, self.deadline);
        let channel = self.ctx.transport.open_channel(key.clone())?;
        let scope = match self.ctx.transport.open_scope(key) {
            Ok(scope) => scope,
            Err(e) => {
                close_sessions(None, Some(channel));
                return Err(e);
            }
        };
        {
            let mut live = self.live.lock().unwrap();
            match &mut *live {
                LiveState::Live(l) => {
                    l.channel = Some(Arc::clone(&channel));
                    l.scope = Some(Arc::clone(&scope));
                }
                _ => {
                    // Disposed while we were opening; hand the sessions
                    // straight back.
                    drop(live);
                    close_sessions(Some(scope), Some(channel));
                    return Ok(());
                }
            }
        }

        let env = ModuleEnv {
            geometry: self.geometry.clone(),
            network: Arc::clone(&channel),
            state: Arc::clone(&scope),
            title_card: Arc::clone(&self.title_card),
            assets: Arc::clone(&self.ctx.assets),
            log_target: format!("wall:module:{}", self.descriptor.name()),
        };
        let loaded = self
            .ctx
            .registry
            .load(
                self.descriptor.name(),
                self.descriptor.path(),
                env,
                self.descriptor.config(),
            )
            .await;
        match loaded {
            Ok(behavior) => {
                let mut live = self.live.lock().unwrap();
                if let LiveState::Live(l) = &mut *live {
                    l.behavior = Some(behavior);
                }
                // Disposed mid-load: dispose already released the
                // sessions; the behavior is simply dropped.
                Ok(())
            }
            Err(e) => {
                let (scope, channel) = {
                    let mut live = self.live.lock().unwrap();
                    match &mut *live {
                        LiveState::Live(l) => (l.scope.take(), l.channel.take()),
                        _ => (None, None),
                    }
                };
                close_sessions(scope, channel);
                Err(e)
            }
        }
    }

    /// Notifies the module it will be shown at `deadline`.
    ///
    /// Preps the container for the transition first. A behavior failure
    /// disposes the instance and re-fails: the module is abandoned, not
    /// displayed.
    pub async fn will_be_shown_soon(&self, deadline: u64) -> Result<(), WallError> {
        if self.descriptor.is_empty() {
            return Ok(());
        }
        let (container, behavior) = match &*self.live.lock().unwrap() {
            LiveState::Live(l) => (l.container, l.behavior.clone()),
            _ => return Ok(()),
        };
        self.ctx.transition.prepare(&self.ctx.stage, container);
        let Some(behavior) = behavior else {
            return Ok(());
        };
        match behavior.will_be_shown_soon(container, deadline).await {
            Ok(()) => self.deliver_pending_fade_in(&behavior),
            Err(e) => {
                self.dispose();
                Err(e)
            }
        }
    }

    /// Delivers a fade-in that was requested while the behavior was still
    /// loading: joins the ticker and forwards the deferred hooks, so a
    /// module that finishes loading after a forced transition still
    /// animates instead of freezing hook-less on screen.
    fn deliver_pending_fade_in(
        &self,
        behavior: &Arc<dyn ModuleBehavior>,
    ) -> Result<(), WallError> {
        let deferred = {
            let mut live = self.live.lock().unwrap();
            match &mut *live {
                LiveState::Live(l) => l.pending_fade_in.take().map(|d| (d, l.finished_in)),
                _ => None,
            }
        };
        let Some((deadline, finished)) = deferred else {
            return Ok(());
        };
        self.ctx.ticker.add(
            self.id,
            Arc::from(self.descriptor.name()),
            Arc::clone(behavior),
        );
        if self.is_disposed() {
            // Disposed between the take and the add; undo the entry.
            self.ctx.ticker.remove(self.id);
            return Ok(());
        }
        match behavior.begin_fade_in(deadline) {
            Ok(()) => {
                if finished {
                    behavior.finish_fade_in();
                }
                Ok(())
            }
            Err(e) => {
                self.dispose();
                Err(e)
            }
        }
    }

    /// Registers with the ticker and starts the module's fade-in.
    ///
    /// A behavior failure disposes the instance and re-fails; a failing
    /// incoming module must never be shown. An instance whose behavior is
    /// still loading (timeout-forced transition) records the deadline and
    /// joins the ticker once loading completes.
    pub fn begin_transition_in(&self, deadline: u64) -> Result<(), WallError> {
        if self.descriptor.is_empty() {
            return Ok(());
        }
        let behavior = {
            let mut live = self.live.lock().unwrap();
            match &mut *live {
                LiveState::Live(l) => match &l.behavior {
                    Some(behavior) => Arc::clone(behavior),
                    None => {
                        l.pending_fade_in = Some(deadline);
                        return Ok(());
                    }
                },
                _ => return Ok(()),
            }
        };
        self.ctx.ticker.add(
            self.id,
            Arc::from(self.descriptor.name()),
            Arc::clone(&behavior),
        );
        match behavior.begin_fade_in(deadline) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.dispose();
                Err(e)
            }
        }
    }

    /// Completes the fade-in: shows the title card and notifies the
    /// module. Assumed non-failing.
    pub fn finish_transition_in(&self) {
        if self.descriptor.is_empty() {
            return;
        }
        let behavior = {
            let mut live = self.live.lock().unwrap();
            match &mut *live {
                LiveState::Live(l) => {
                    l.finished_in = true;
                    l.behavior.clone()
                }
                _ => None,
            }
        };
        self.title_card.enter();
        if let Some(behavior) = behavior {
            behavior.finish_fade_in();
        }
    }

    /// Starts the module's fade-out and hides the title card.
    pub fn begin_transition_out(&self, deadline: u64) {
        if self.descriptor.is_empty() {
            return;
        }
        self.title_card.exit();
        if let Some(behavior) = self.behavior() {
            behavior.begin_fade_out(deadline);
        }
    }

    /// Completes the fade-out. Assumed non-failing.
    pub fn finish_transition_out(&self) {
        if self.descriptor.is_empty() {
            return;
        }
        if let Some(behavior) = self.behavior() {
            behavior.finish_fade_out();
        }
    }

    /// Notifies the module it will be hidden at `deadline`.
    ///
    /// Every instance that is ever shown is told this before disposal,
    /// even when an early abort means it is never actually faded out.
    pub fn will_be_hidden_soon(&self, deadline: u64) {
        if self.descriptor.is_empty() {
            return;
        }
        if let Some(behavior) = self.behavior() {
            behavior.will_be_hidden_soon(deadline);
        }
    }

    /// Runs the transition strategy from `outgoing` to this instance,
    /// resolving when the window ending at `deadline` elapses.
    pub async fn perform_transition(&self, outgoing: &RunningModule, deadline: u64) {
        self.ctx
            .transition
            .perform(outgoing, self, self.ctx.clock, &self.ctx.stage, deadline)
            .await;
    }

    /// Idempotent teardown.
    ///
    /// Removes the container from the stage, removes the instance from
    /// the ticker, then closes the state scope and the network channel,
    /// in that order. Teardown failures are logged, never propagated.
    pub fn dispose(&self) {
        let prev = {
            let mut live = self.live.lock().unwrap();
            std::mem::replace(&mut *live, LiveState::Disposed)
        };
        let LiveState::Live(live) = prev else {
            return;
        };
        self.ctx.stage.remove(live.container);
        if self.descriptor.is_empty() {
            return;
        }
        self.title_card.exit();
        self.ctx.ticker.remove(self.id);
        close_sessions(live.scope, live.channel);
        debug!(module = %self.descriptor.name(), id = self.id, "instance disposed");
    }
}

/// Closes a scope then a channel, logging failures.
fn close_sessions(scope: Option<Arc<dyn StateScope>>, channel: Option<Arc<dyn NetworkChannel>>) {
    if let Some(scope) = scope {
        if let Err(e) = scope.close() {
            warn!(error = %e, label = e.as_label(), "state scope close failed");
        }
    }
    if let Some(channel) = channel {
        if let Err(e) = channel.close() {
            warn!(error = %e, label = e.as_label(), "network channel close failed");
        }
    }
}
