//! # wallkit
//!
//! **Wallkit** is an orchestration library for tiled video walls.
//!
//! It provides the module lifecycle machinery between a scheduler (which
//! decides *what* to show *when*) and a rendering layer (which draws it):
//! deadline-driven state machines per wall region, a strict module
//! lifecycle contract, pluggable transitions, and a monitoring bus.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!        scheduler                          scheduler
//!   "show X at deadline"                 "stop by deadline"
//!            │                                  │
//!            ▼                                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Machine (one per wall region; driver task serializes commands)   │
//! │  - Idle / Prepare / Transition / Display / Error states           │
//! │  - two-timer transition (fade start at deadline, fixed window)    │
//! │  - generation-stamped timers (stale callbacks rejected)           │
//! └──────┬──────────────────────┬──────────────────────┬──────────────┘
//!        ▼                      ▼                      ▼
//! ┌──────────────┐      ┌───────────────┐      ┌───────────────┐
//! │RunningModule │      │ RunningModule │      │ RunningModule │
//! │ (incoming)   │      │ (outgoing)    │      │ (next...)     │
//! └──┬───────────┘      └──┬────────────┘      └───────────────┘
//!    │ instantiate:        │ lifecycle hooks:
//!    │ - container (Stage) │ - will_be_hidden_soon
//!    │ - channel (net)     │ - begin/finish_fade_out
//!    │ - state scope (net) │ - dispose (exactly once)
//!    │ - behavior (load)   │
//!    ▼                     ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  shared per process: Clock, Stage, ModuleTicker, WallTransport,   │
//! │  ModuleRegistry, Bus (monitoring events), Transition strategy     │
//! └───────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Placement lifecycle
//! ```text
//! next_module(descriptor, deadline)
//!   │
//!   ├─► Prepare: instantiate (container, channel, scope, behavior)
//!   │     ├─► will_be_shown_soon resolved before deadline ─► Transition
//!   │     ├─► deadline hit first ─► Transition anyway (timeout forced)
//!   │     └─► load/pre-show error ─► dispose, Error sink
//!   │
//!   ├─► Transition: fade starts exactly at `deadline`, runs a fixed
//!   │     window (default 5 s); requests arriving mid-fade wait in a
//!   │     one-slot buffer (later request overwrites earlier)
//!   │
//!   └─► fade end: outgoing retired (ticker remove + dispose)
//!         ├─ buffered request ─► Prepare (incoming becomes outgoing)
//!         └─ otherwise        ─► Display
//! ```
//!
//! ## Features
//! | Area            | Description                                                       | Key types / traits                       |
//! |-----------------|-------------------------------------------------------------------|------------------------------------------|
//! | **Machine**     | Deadline-driven per-region state machine.                         | [`Machine`]                              |
//! | **Modules**     | Instance lifecycle, behavior contract, load registry, ticker.     | [`RunningModule`], [`ModuleBehavior`], [`ModuleRegistry`], [`ModuleTicker`] |
//! | **Transitions** | Pluggable cross-fade strategies over the stage.                   | [`Transition`], [`FadeTransition`]       |
//! | **Library**     | Module descriptors with `extends` inheritance.                    | [`ModuleDescriptor`], [`ModuleLibrary`]  |
//! | **Transport**   | Per-instance channels and state scopes, keyed by geometry+deadline.| [`WallTransport`], [`InstanceKey`]      |
//! | **Monitoring**  | Broadcast bus of machine events.                                  | [`Bus`], [`Event`], [`EventKind`]        |
//! | **Player**      | Client loop decoding scheduler messages into machine requests.    | [`ModulePlayer`], [`LoadModuleMessage`]  |
//! | **Errors**      | Typed errors for loading, sessions, and behavior hooks.           | [`WallError`], [`TeardownError`]         |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use wallkit::{
//!     Credit, DirAssets, FactoryFn, MemoryTransport, ModuleBehavior, ModuleDescriptor,
//!     ModulePlayer, ModuleRegistry, Polygon, WallConfig, WallContext,
//! };
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl ModuleBehavior for Hello {}
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     // Register load entry points for the modules this wall can show.
//!     let registry = ModuleRegistry::new();
//!     registry.register(
//!         "modules/hello",
//!         FactoryFn::arc(|_env, _cfg| Ok(Arc::new(Hello) as _)),
//!     );
//!
//!     let ctx = WallContext::new(
//!         WallConfig::default(),
//!         MemoryTransport::new(),
//!         registry,
//!         DirAssets::new("/assets"),
//!     );
//!
//!     // One player per wall region this client renders.
//!     let player = ModulePlayer::new(
//!         Arc::clone(&ctx),
//!         Polygon::rect(0.0, 0.0, 1920.0, 1080.0),
//!     );
//!
//!     // Normally this arrives as a LoadModule message from the scheduler.
//!     let descriptor = ModuleDescriptor::new(
//!         "hello",
//!         "modules/hello",
//!         serde_json::Map::new(),
//!         Credit::default(),
//!     );
//!     player.play_module(descriptor, ctx.clock.in_future(50));
//!
//!     tokio::time::sleep(Duration::from_millis(100)).await;
//!     player.stop(ctx.clock.now());
//! }
//! ```
mod clock;
mod config;
mod context;
mod error;
mod events;
mod geometry;
mod library;
mod machine;
mod modules;
mod net;
mod player;
mod stage;
mod transition;

// ---- Public re-exports ----

pub use clock::Clock;
pub use config::WallConfig;
pub use context::WallContext;
pub use error::{TeardownError, WallError};
pub use events::{Bus, Event, EventKind};
pub use geometry::{Point, Polygon, Rect};
pub use library::{BrickConfig, Credit, ModuleDescriptor, ModuleLibrary, EMPTY_MODULE};
pub use machine::Machine;
pub use modules::{
    AssetResolver, DirAssets, FactoryFn, ModuleBehavior, ModuleEnv, ModuleFactory,
    ModuleRegistry, ModuleTicker, RunningModule, TitleCard,
};
pub use net::{InstanceKey, MemoryTransport, NetworkChannel, StateScope, WallTransport};
pub use player::{LoadModuleMessage, ModulePlayer};
pub use stage::{Container, ContainerId, Fade, Stage};
pub use transition::{FadeTransition, Transition};
