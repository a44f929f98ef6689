//! End-to-end machine scenarios under paused virtual time.
//!
//! Each test drives a machine through scheduler requests with a scripted
//! module behavior that records every hook call with the clock reading,
//! then asserts on call order, timing, and resource release.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value};

use crate::clock::Clock;
use crate::config::WallConfig;
use crate::context::WallContext;
use crate::error::WallError;
use crate::events::EventKind;
use crate::geometry::Polygon;
use crate::library::{Credit, ModuleDescriptor};
use crate::modules::{DirAssets, FactoryFn, ModuleBehavior, ModuleEnv, ModuleFactory};
use crate::net::MemoryTransport;
use crate::stage::ContainerId;

use super::Machine;

#[derive(Clone, Default)]
struct CallLog(Arc<Mutex<Vec<(String, u64)>>>);

impl CallLog {
    fn record(&self, module: &str, hook: &str, at: u64) {
        self.0.lock().unwrap().push((format!("{module}:{hook}"), at));
    }

    /// Clock readings of every `module:hook` call, in order.
    fn times(&self, call: &str) -> Vec<u64> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| name == call)
            .map(|(_, at)| *at)
            .collect()
    }

    fn count(&self, call: &str) -> usize {
        self.times(call).len()
    }
}

#[derive(Clone, Copy)]
enum ShowMode {
    Ready,
    Fail,
    Hang,
}

struct Scripted {
    name: String,
    clock: Clock,
    log: CallLog,
    mode: ShowMode,
}

#[async_trait::async_trait]
impl ModuleBehavior for Scripted {
    async fn will_be_shown_soon(
        &self,
        _container: ContainerId,
        _deadline: u64,
    ) -> Result<(), WallError> {
        self.log
            .record(&self.name, "will_be_shown_soon", self.clock.now());
        match self.mode {
            ShowMode::Ready => Ok(()),
            ShowMode::Fail => Err(WallError::behavior(
                self.name.clone(),
                "will_be_shown_soon",
                "scripted failure",
            )),
            ShowMode::Hang => {
                std::future::pending::<()>().await;
                Ok(())
            }
        }
    }

    fn begin_fade_in(&self, _deadline: u64) -> Result<(), WallError> {
        self.log.record(&self.name, "begin_fade_in", self.clock.now());
        Ok(())
    }

    fn finish_fade_in(&self) {
        self.log
            .record(&self.name, "finish_fade_in", self.clock.now());
    }

    fn will_be_hidden_soon(&self, _deadline: u64) {
        self.log
            .record(&self.name, "will_be_hidden_soon", self.clock.now());
    }

    fn begin_fade_out(&self, _deadline: u64) {
        self.log
            .record(&self.name, "begin_fade_out", self.clock.now());
    }

    fn finish_fade_out(&self) {
        self.log
            .record(&self.name, "finish_fade_out", self.clock.now());
    }
}

/// Factory whose load only resolves after a fixed delay.
struct SlowFactory {
    name: &'static str,
    delay: Duration,
    clock: Clock,
    log: CallLog,
}

#[async_trait::async_trait]
impl ModuleFactory for SlowFactory {
    async fn load(
        &self,
        _env: ModuleEnv,
        _config: &Map<String, Value>,
    ) -> Result<Arc<dyn ModuleBehavior>, WallError> {
        tokio::time::sleep(self.delay).await;
        Ok(Arc::new(Scripted {
            name: self.name.to_string(),
            clock: self.clock,
            log: self.log.clone(),
            mode: ShowMode::Ready,
        }))
    }
}

struct Rig {
    ctx: Arc<WallContext>,
    transport: Arc<MemoryTransport>,
    log: CallLog,
}

impl Rig {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
        let transport = MemoryTransport::new();
        let ctx = WallContext::new(
            WallConfig::default(),
            Arc::clone(&transport) as _,
            crate::modules::ModuleRegistry::new(),
            DirAssets::new("/assets"),
        );
        Self {
            ctx,
            transport,
            log: CallLog::default(),
        }
    }

    /// Registers a scripted module and returns its descriptor.
    fn module(&self, name: &'static str, mode: ShowMode) -> ModuleDescriptor {
        let path = format!("modules/{name}");
        let log = self.log.clone();
        let clock = self.ctx.clock;
        self.ctx.registry.register(
            path.clone(),
            FactoryFn::arc(move |_env, _cfg| {
                Ok(Arc::new(Scripted {
                    name: name.to_string(),
                    clock,
                    log: log.clone(),
                    mode,
                }) as _)
            }),
        );
        ModuleDescriptor::new(name, path, Map::new(), Credit::default())
    }

    /// Registers a module whose load resolves only after `delay`.
    fn slow_module(&self, name: &'static str, delay: Duration) -> ModuleDescriptor {
        let path = format!("modules/{name}");
        self.ctx.registry.register(
            path.clone(),
            Arc::new(SlowFactory {
                name,
                delay,
                clock: self.ctx.clock,
                log: self.log.clone(),
            }),
        );
        ModuleDescriptor::new(name, path, Map::new(), Credit::default())
    }

    fn machine(&self) -> Machine {
        Machine::spawn(Arc::clone(&self.ctx), Polygon::rect(0.0, 0.0, 1920.0, 1080.0))
    }
}

async fn at(ms: u64, clock: Clock) {
    clock.sleep_until(ms).await;
}

#[tokio::test(start_paused = true)]
async fn first_module_fades_in_at_deadline_and_displays_after_window() {
    let rig = Rig::new();
    let mut events = rig.ctx.bus.subscribe();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("clock", ShowMode::Ready), 1000);

    at(999, clock).await;
    assert_eq!(rig.log.count("clock:will_be_shown_soon"), 1);
    assert_eq!(rig.log.count("clock:begin_fade_in"), 0);

    at(1010, clock).await;
    assert_eq!(rig.log.times("clock:begin_fade_in"), vec![1000]);

    at(6010, clock).await;
    assert_eq!(rig.log.times("clock:finish_fade_in"), vec![6000]);

    // Exactly the incoming module remains: one container, fully visible,
    // one open channel and scope; the empty outgoing instance is gone.
    assert_eq!(rig.ctx.stage.len(), 1);
    assert_eq!(rig.transport.open_sessions(), 2);
    assert_eq!(rig.ctx.ticker.len(), 1);

    // State timeline on the monitoring bus.
    let mut states = Vec::new();
    let mut fade_started_at = None;
    let mut fade_finished_at = None;
    while let Ok(ev) = events.try_recv() {
        match ev.kind {
            EventKind::StateEntered => states.push((ev.state.unwrap(), ev.at)),
            EventKind::FadeStarted => fade_started_at = Some(ev.at),
            EventKind::FadeFinished => fade_finished_at = Some(ev.at),
            _ => {}
        }
    }
    let names: Vec<&str> = states.iter().map(|(s, _)| *s).collect();
    assert_eq!(names, vec!["idle", "prepare", "transition", "display"]);
    assert_eq!(fade_started_at, Some(1000));
    assert_eq!(fade_finished_at, Some(6000));
    let display_entered = states.last().unwrap().1;
    assert_eq!(display_entered, 6000);
}

#[tokio::test(start_paused = true)]
async fn second_request_during_prepare_supersedes_the_first() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("slow", ShowMode::Hang), 1000);
    at(10, clock).await;
    assert_eq!(rig.log.count("slow:will_be_shown_soon"), 1);

    machine.next_module(rig.module("fast", ShowMode::Ready), 2000);
    at(2100, clock).await;

    // The abandoned incoming was told it will be hidden and never shown.
    assert_eq!(rig.log.count("slow:will_be_hidden_soon"), 1);
    assert_eq!(rig.log.count("slow:begin_fade_in"), 0);
    assert_eq!(rig.log.times("fast:begin_fade_in"), vec![2000]);
    // Only the fast module's sessions remain open.
    assert_eq!(rig.transport.open_sessions(), 2);
}

#[tokio::test(start_paused = true)]
async fn preparation_timeout_forces_progress() {
    let rig = Rig::new();
    let mut events = rig.ctx.bus.subscribe();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("stuck", ShowMode::Hang), 1000);
    at(6010, clock).await;

    // The pre-show never resolved, yet the fade started at the deadline.
    assert_eq!(rig.log.times("stuck:begin_fade_in"), vec![1000]);
    assert_eq!(rig.log.times("stuck:finish_fade_in"), vec![6000]);

    let mut timed_out = false;
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::PreparationTimeout {
            timed_out = true;
            assert_eq!(ev.deadline, Some(1000));
        }
    }
    assert!(timed_out);
}

#[tokio::test(start_paused = true)]
async fn late_load_still_joins_the_animation() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.slow_module("tardy", Duration::from_millis(3000)), 1000);

    // The deadline forces the transition with nothing to animate yet.
    at(1100, clock).await;
    assert!(rig.ctx.ticker.is_empty());
    assert_eq!(rig.log.count("tardy:begin_fade_in"), 0);

    // Load resolves mid-window: the instance joins the ticker and gets
    // its fade-in late instead of freezing hook-less on screen.
    at(3100, clock).await;
    assert_eq!(rig.log.count("tardy:will_be_shown_soon"), 1);
    assert_eq!(rig.log.times("tardy:begin_fade_in"), vec![3000]);
    assert_eq!(rig.ctx.ticker.len(), 1);

    at(6100, clock).await;
    assert_eq!(rig.log.times("tardy:finish_fade_in"), vec![6000]);
    assert_eq!(rig.ctx.stage.len(), 1);
    assert_eq!(rig.transport.open_sessions(), 2);
}

#[tokio::test(start_paused = true)]
async fn requests_during_transition_coalesce_to_the_last() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("first", ShowMode::Ready), 1000);
    at(1500, clock).await;

    // Mid-fade: both of these land in the single buffer slot; the second
    // overwrites the first.
    machine.next_module(rig.module("skipped", ShowMode::Ready), 7000);
    machine.next_module(rig.module("kept", ShowMode::Ready), 8000);

    at(6100, clock).await;
    assert_eq!(rig.log.count("skipped:will_be_shown_soon"), 0);
    assert_eq!(rig.log.count("kept:will_be_shown_soon"), 1);

    at(8100, clock).await;
    assert_eq!(rig.log.times("kept:begin_fade_in"), vec![8000]);
    assert_eq!(rig.log.count("skipped:begin_fade_in"), 0);
    // The first module was told it will be hidden when the buffered
    // request re-entered preparation.
    assert_eq!(rig.log.count("first:will_be_hidden_soon"), 1);
}

#[tokio::test(start_paused = true)]
async fn failing_preshow_is_never_shown_and_sinks_the_machine() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("broken", ShowMode::Fail), 1000);
    at(100, clock).await;

    assert_eq!(rig.log.count("broken:begin_fade_in"), 0);
    assert_eq!(rig.transport.open_sessions(), 0);
    assert!(rig.ctx.stage.is_empty());

    // The error sink ignores further scheduling.
    let good = rig.module("good", ShowMode::Ready);
    machine.next_module(good.clone(), 2000);
    at(2500, clock).await;
    assert_eq!(rig.log.count("good:will_be_shown_soon"), 0);

    // External restart is the only way back.
    machine.restart_after_error();
    machine.next_module(good, 3000);
    at(3100, clock).await;
    assert_eq!(rig.log.times("good:begin_fade_in"), vec![3000]);
}

#[tokio::test(start_paused = true)]
async fn handle_error_during_display_quiesces_the_region() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("showing", ShowMode::Ready), 1000);
    at(6100, clock).await;
    assert_eq!(rig.ctx.ticker.len(), 1);

    machine.handle_error(WallError::load("showing", "scheduler gave up"));
    at(6200, clock).await;

    assert_eq!(rig.log.count("showing:will_be_hidden_soon"), 1);
    assert!(rig.ctx.ticker.is_empty());
    assert!(rig.ctx.stage.is_empty());
    assert_eq!(rig.transport.open_sessions(), 0);

    machine.next_module(rig.module("later", ShowMode::Ready), 7000);
    at(7500, clock).await;
    assert_eq!(rig.log.count("later:will_be_shown_soon"), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_mid_transition_abandons_the_fade() {
    let rig = Rig::new();
    let machine = rig.machine();
    let clock = rig.ctx.clock;

    machine.next_module(rig.module("fading", ShowMode::Ready), 1000);
    at(1500, clock).await;
    assert_eq!(rig.ctx.ticker.len(), 1);

    machine.stop(2000);
    at(1600, clock).await;

    assert_eq!(rig.log.count("fading:will_be_hidden_soon"), 1);
    assert!(rig.ctx.ticker.is_empty());
    assert!(rig.ctx.stage.is_empty());
    assert_eq!(rig.transport.open_sessions(), 0);
    // No late fade-end fires out of the abandoned window.
    at(6100, clock).await;
    assert_eq!(rig.log.count("fading:finish_fade_in"), 0);

    // The machine is idle again, not dead.
    machine.next_module(rig.module("next", ShowMode::Ready), 7000);
    at(7100, clock).await;
    assert_eq!(rig.log.times("next:begin_fade_in"), vec![7000]);
}
