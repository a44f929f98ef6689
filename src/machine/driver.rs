//! # Machine driver: the task that owns a region's state.
//!
//! The driver serializes everything that can touch a region: scheduler
//! requests, timer callbacks, and error escalation all arrive as
//! [`Command`]s on one queue and are handled to completion in order.
//! State payloads live in a tagged [`State`] enum; a single
//! [`Driver::enter`] swaps the active state, cancelling the timers the
//! old state armed and stamping a fresh generation so a late message from
//! a superseded state is rejected.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use tracing::{debug, error};

use crate::context::WallContext;
use crate::error::WallError;
use crate::events::{Event, EventKind};
use crate::geometry::Polygon;
use crate::library::ModuleDescriptor;
use crate::modules::RunningModule;

use super::Command;

/// Active state of one region machine.
enum State {
    /// Quiescent; nothing shown, nothing loading.
    Idle,
    /// Loading `incoming` while `outgoing` is still on screen.
    Prepare {
        outgoing: Arc<RunningModule>,
        incoming: Arc<RunningModule>,
        deadline: u64,
        token: CancellationToken,
    },
    /// Timed cross-fade window between the two instances.
    Transition {
        outgoing: Arc<RunningModule>,
        incoming: Arc<RunningModule>,
        deadline: u64,
        /// At most one request buffered mid-transition; a later request
        /// overwrites an earlier unconsumed one.
        buffered: Option<(ModuleDescriptor, u64)>,
        token: CancellationToken,
    },
    /// Steady display of one instance.
    Display { current: Arc<RunningModule> },
    /// Sink; only an external restart leads back to `Idle`.
    Error,
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Idle => "idle",
            State::Prepare { .. } => "prepare",
            State::Transition { .. } => "transition",
            State::Display { .. } => "display",
            State::Error => "error",
        }
    }

    fn deadline(&self) -> Option<u64> {
        match self {
            State::Prepare { deadline, .. } | State::Transition { deadline, .. } => {
                Some(*deadline)
            }
            _ => None,
        }
    }

    fn token(&self) -> Option<&CancellationToken> {
        match self {
            State::Prepare { token, .. } | State::Transition { token, .. } => Some(token),
            _ => None,
        }
    }
}

pub(super) struct Driver {
    ctx: Arc<WallContext>,
    geometry: Polygon,
    region: Arc<str>,
    tx: mpsc::UnboundedSender<Command>,
    rx: mpsc::UnboundedReceiver<Command>,
    shutdown: CancellationToken,
    state: State,
    generation: u64,
}

impl Driver {
    pub(super) fn new(
        ctx: Arc<WallContext>,
        geometry: Polygon,
        region: Arc<str>,
        tx: mpsc::UnboundedSender<Command>,
        rx: mpsc::UnboundedReceiver<Command>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            geometry,
            region,
            tx,
            rx,
            shutdown,
            state: State::Idle,
            generation: 0,
        }
    }

    pub(super) async fn run(mut self) {
        self.publish(Event::at(EventKind::StateEntered, self.ctx.clock.now()).with_state("idle"));
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => self.handle(cmd),
                    None => break,
                },
            }
        }
        // Handle dropped: release whatever the region still holds.
        self.quiesce(self.ctx.clock.now());
    }

    fn handle(&mut self, cmd: Command) {
        match cmd {
            Command::NextModule {
                descriptor,
                deadline,
            } => self.on_next_module(descriptor, deadline),
            Command::Stop { deadline } => self.on_stop(deadline),
            Command::HandleError { error } => self.on_error(error),
            Command::Restart => self.on_restart(),
            Command::PrepareDone { generation, result } => self.on_prepare_done(generation, result),
            Command::PrepareTimeout { generation } => self.on_prepare_timeout(generation),
            Command::FadeStart { generation } => self.on_fade_start(generation),
            Command::FadeEnd { generation } => self.on_fade_end(generation),
        }
    }

    fn publish(&self, ev: Event) {
        self.ctx.bus.publish(ev.with_region(Arc::clone(&self.region)));
    }

    /// Swaps the active state: cancels the old state's timers, bumps the
    /// generation, publishes the entry record.
    fn enter(&mut self, new: State) {
        if let Some(token) = self.state.token() {
            token.cancel();
        }
        self.generation = self.generation.wrapping_add(1);
        let mut ev = Event::at(EventKind::StateEntered, self.ctx.clock.now())
            .with_state(new.name());
        if let Some(deadline) = new.deadline() {
            ev = ev.with_deadline(deadline);
        }
        debug!(region = %self.region, state = new.name(), "state entered");
        self.state = new;
        self.publish(ev);
    }

    fn on_next_module(&mut self, descriptor: ModuleDescriptor, deadline: u64) {
        self.publish(
            Event::at(EventKind::NextModuleRequested, self.ctx.clock.now())
                .with_module(descriptor.name().to_string())
                .with_deadline(deadline),
        );
        match &mut self.state {
            State::Idle => {
                let outgoing = RunningModule::empty(Arc::clone(&self.ctx));
                self.enter_prepare(outgoing, descriptor, deadline);
            }
            State::Prepare {
                outgoing,
                incoming,
                deadline: old_deadline,
                ..
            } => {
                // Superseded mid-preparation: the current incoming will
                // never be shown. Honor the lifecycle contract, retire it,
                // and prepare the new descriptor with the same outgoing.
                let outgoing = Arc::clone(outgoing);
                let incoming = Arc::clone(incoming);
                let old_deadline = *old_deadline;
                incoming.will_be_hidden_soon(old_deadline);
                incoming.dispose();
                self.enter_prepare(outgoing, descriptor, deadline);
            }
            State::Transition { buffered, .. } => {
                // The running fade is never interrupted; the request waits
                // for the end of the window. One slot only.
                *buffered = Some((descriptor, deadline));
            }
            State::Display { current } => {
                let outgoing = Arc::clone(current);
                self.enter_prepare(outgoing, descriptor, deadline);
            }
            State::Error => {}
        }
    }

    fn on_stop(&mut self, deadline: u64) {
        self.publish(
            Event::at(EventKind::StopRequested, self.ctx.clock.now()).with_deadline(deadline),
        );
        if matches!(self.state, State::Error) {
            return;
        }
        self.quiesce(deadline);
    }

    /// Stop semantics of the current state: hide, unregister, dispose,
    /// return to `Idle`. Shared by `stop`, error escalation, and driver
    /// shutdown.
    fn quiesce(&mut self, deadline: u64) {
        match &self.state {
            State::Idle | State::Error => {}
            State::Prepare {
                outgoing, incoming, ..
            } => {
                let outgoing = Arc::clone(outgoing);
                let incoming = Arc::clone(incoming);
                incoming.will_be_hidden_soon(deadline);
                incoming.dispose();
                outgoing.dispose();
                self.enter(State::Idle);
            }
            State::Transition {
                outgoing, incoming, ..
            } => {
                // Mid-fade stop hides both instances; the running
                // animation is abandoned, not played to completion.
                let outgoing = Arc::clone(outgoing);
                let incoming = Arc::clone(incoming);
                outgoing.will_be_hidden_soon(deadline);
                incoming.will_be_hidden_soon(deadline);
                self.ctx.ticker.remove(outgoing.id());
                self.ctx.ticker.remove(incoming.id());
                outgoing.dispose();
                incoming.dispose();
                self.enter(State::Idle);
            }
            State::Display { current } => {
                let current = Arc::clone(current);
                current.will_be_hidden_soon(deadline);
                self.ctx.ticker.remove(current.id());
                current.dispose();
                self.enter(State::Idle);
            }
        }
    }

    fn on_error(&mut self, err: WallError) {
        if matches!(self.state, State::Error) {
            return;
        }
        error!(region = %self.region, error = %err, label = err.as_label(), "machine error");
        self.publish(
            Event::at(EventKind::ErrorRaised, self.ctx.clock.now()).with_reason(err.to_string()),
        );
        // Quiesce per the current state's own stop semantics, then sink.
        self.quiesce(self.ctx.clock.now());
        self.enter(State::Error);
    }

    fn on_restart(&mut self) {
        if !matches!(self.state, State::Error) {
            return;
        }
        self.publish(Event::at(EventKind::MachineRestarted, self.ctx.clock.now()));
        self.enter(State::Idle);
    }

    fn enter_prepare(
        &mut self,
        outgoing: Arc<RunningModule>,
        descriptor: ModuleDescriptor,
        deadline: u64,
    ) {
        let incoming = RunningModule::new(
            Arc::clone(&self.ctx),
            descriptor,
            self.geometry.clone(),
            deadline,
        );
        let token = CancellationToken::new();
        self.enter(State::Prepare {
            outgoing: Arc::clone(&outgoing),
            incoming: Arc::clone(&incoming),
            deadline,
            token: token.clone(),
        });

        // Every instance that was ever shown is told it will be hidden
        // before disposal, even if an abort means it never fades out.
        outgoing.will_be_hidden_soon(deadline);

        let generation = self.generation;

        // Load and pre-show. The work itself is never cancelled when a
        // newer request supersedes it; only its result is discarded, via
        // the generation stamp.
        let tx = self.tx.clone();
        let loading = Arc::clone(&incoming);
        tokio::spawn(async move {
            let result = async {
                loading.instantiate().await?;
                loading.will_be_shown_soon(deadline).await
            }
            .await;
            let _ = tx.send(Command::PrepareDone { generation, result });
        });

        // Deadline watchdog: forces the transition if loading overruns.
        let tx = self.tx.clone();
        let clock = self.ctx.clock;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = clock.sleep_until(deadline) => {
                    let _ = tx.send(Command::PrepareTimeout { generation });
                }
            }
        });
    }

    fn on_prepare_done(&mut self, generation: u64, result: Result<(), WallError>) {
        if generation != self.generation {
            return;
        }
        let State::Prepare {
            outgoing, incoming, deadline, ..
        } = &self.state
        else {
            return;
        };
        let (outgoing, incoming, deadline) =
            (Arc::clone(outgoing), Arc::clone(incoming), *deadline);
        match result {
            Ok(()) => self.enter_transition(outgoing, incoming, deadline),
            // The failing instance already disposed itself; escalate.
            Err(e) => self.on_error(e),
        }
    }

    fn on_prepare_timeout(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        let State::Prepare {
            outgoing, incoming, deadline, ..
        } = &self.state
        else {
            return;
        };
        let (outgoing, incoming, deadline) =
            (Arc::clone(outgoing), Arc::clone(incoming), *deadline);
        error!(
            region = %self.region,
            module = %incoming.descriptor().name(),
            deadline,
            "preparation timeout; transitioning anyway"
        );
        self.publish(
            Event::at(EventKind::PreparationTimeout, self.ctx.clock.now())
                .with_module(incoming.descriptor().name().to_string())
                .with_deadline(deadline),
        );
        self.enter_transition(outgoing, incoming, deadline);
    }

    fn enter_transition(
        &mut self,
        outgoing: Arc<RunningModule>,
        incoming: Arc<RunningModule>,
        deadline: u64,
    ) {
        let token = CancellationToken::new();
        self.enter(State::Transition {
            outgoing,
            incoming,
            deadline,
            buffered: None,
            token: token.clone(),
        });
        let generation = self.generation;
        let tx = self.tx.clone();
        let clock = self.ctx.clock;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = clock.sleep_until(deadline) => {
                    let _ = tx.send(Command::FadeStart { generation });
                }
            }
        });
    }

    fn on_fade_start(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        let State::Transition {
            outgoing,
            incoming,
            deadline,
            token,
            ..
        } = &self.state
        else {
            return;
        };
        let (outgoing, incoming, deadline, token) = (
            Arc::clone(outgoing),
            Arc::clone(incoming),
            *deadline,
            token.clone(),
        );
        let end = deadline + self.ctx.config.transition_ms();
        self.publish(
            Event::at(EventKind::FadeStarted, self.ctx.clock.now())
                .with_module(incoming.descriptor().name().to_string())
                .with_deadline(deadline),
        );

        if let Err(e) = incoming.begin_transition_in(end) {
            // The incoming instance disposed itself; the outgoing one
            // survives and keeps the region displaying.
            error!(region = %self.region, error = %e, "fade-in refused; keeping previous module");
            self.publish(
                Event::at(EventKind::ErrorRaised, self.ctx.clock.now())
                    .with_reason(e.to_string()),
            );
            self.enter(State::Display { current: outgoing });
            return;
        }
        outgoing.begin_transition_out(end);

        // Drive the visual cross-fade; abandoned (not completed) if the
        // state exits early.
        let fade_token = token.clone();
        let fade_in = Arc::clone(&incoming);
        let fade_out = Arc::clone(&outgoing);
        tokio::spawn(async move {
            tokio::select! {
                _ = fade_token.cancelled() => {}
                _ = fade_in.perform_transition(&fade_out, end) => {}
            }
        });

        let tx = self.tx.clone();
        let clock = self.ctx.clock;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = clock.sleep_until(end) => {
                    let _ = tx.send(Command::FadeEnd { generation });
                }
            }
        });
    }

    fn on_fade_end(&mut self, generation: u64) {
        if generation != self.generation {
            return;
        }
        let State::Transition {
            outgoing,
            incoming,
            deadline,
            buffered,
            ..
        } = &mut self.state
        else {
            return;
        };
        let (outgoing, incoming, deadline) =
            (Arc::clone(outgoing), Arc::clone(incoming), *deadline);
        let buffered = buffered.take();
        self.publish(
            Event::at(EventKind::FadeFinished, self.ctx.clock.now())
                .with_module(incoming.descriptor().name().to_string())
                .with_deadline(deadline),
        );

        incoming.finish_transition_in();
        outgoing.finish_transition_out();
        self.ctx.ticker.remove(outgoing.id());
        outgoing.dispose();

        match buffered {
            Some((descriptor, next_deadline)) => {
                self.enter_prepare(incoming, descriptor, next_deadline);
            }
            None => self.enter(State::Display { current: incoming }),
        }
    }
}
