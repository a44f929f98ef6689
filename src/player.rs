//! # Client-side module player.
//!
//! A [`ModulePlayer`] is the thin client loop in front of one region's
//! [`Machine`]: it decodes `LoadModule` messages from the control
//! connection and turns them into machine requests. The player never
//! decides *what* to show; it only relays the scheduler's choice with its
//! deadline.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::context::WallContext;
use crate::error::WallError;
use crate::geometry::Polygon;
use crate::library::ModuleDescriptor;
use crate::machine::Machine;

/// Wire message instructing a client to show a module.
///
/// `time` is the absolute deadline (ms on the shared wall clock) at which
/// the fade-in must begin; `geo` is the wall region the placement covers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoadModuleMessage {
    /// The module to load.
    pub module: ModuleDescriptor,
    /// Absolute deadline (ms) for the start of the fade-in.
    pub time: u64,
    /// Wall region the placement covers.
    pub geo: Polygon,
}

impl LoadModuleMessage {
    /// Decodes a message from its JSON wire form.
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Encodes the message to its JSON wire form.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// One region's client player: owns the region machine and feeds it
/// scheduler messages.
pub struct ModulePlayer {
    machine: Machine,
}

impl ModulePlayer {
    /// Spawns the player (and its region machine) for `geometry`.
    pub fn new(ctx: Arc<WallContext>, geometry: Polygon) -> Self {
        Self {
            machine: Machine::spawn(ctx, geometry),
        }
    }

    /// Region label this player drives.
    pub fn region(&self) -> &str {
        self.machine.region()
    }

    /// Relays a decoded `LoadModule` message to the machine.
    ///
    /// The region assignment in the message is informational here; the
    /// machine's geometry was fixed when the player was spawned.
    pub fn play(&self, msg: LoadModuleMessage) {
        let assigned = msg.geo.extents().fingerprint();
        if assigned != self.machine.region() {
            debug!(
                region = self.machine.region(),
                assigned, "placement geometry differs from player region"
            );
        }
        self.machine.next_module(msg.module, msg.time);
    }

    /// Asks the region to show `descriptor`, fading in at `deadline`.
    pub fn play_module(&self, descriptor: ModuleDescriptor, deadline: u64) {
        self.machine.next_module(descriptor, deadline);
    }

    /// Asks the region to go blank by `deadline`.
    pub fn stop(&self, deadline: u64) {
        self.machine.stop(deadline);
    }

    /// Escalates an error into the region machine.
    pub fn handle_error(&self, error: WallError) {
        self.machine.handle_error(error);
    }

    /// Restarts the machine out of the error sink.
    pub fn restart(&self) {
        self.machine.restart_after_error();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::{json, Map};

    use crate::config::WallConfig;
    use crate::library::Credit;
    use crate::modules::{DirAssets, FactoryFn, ModuleBehavior, ModuleRegistry};
    use crate::net::MemoryTransport;

    struct Quiet;

    #[async_trait::async_trait]
    impl ModuleBehavior for Quiet {}

    #[test]
    fn decodes_the_wire_form() {
        let raw = json!({
            "module": {
                "name": "slideshow",
                "path": "modules/slideshow",
                "config": {"period": 8000},
                "credit": {"title": "Slideshow", "author": "wall team"},
            },
            "time": 123456,
            "geo": [
                {"x": 0.0, "y": 0.0},
                {"x": 1920.0, "y": 0.0},
                {"x": 1920.0, "y": 1080.0},
                {"x": 0.0, "y": 1080.0},
            ],
        })
        .to_string();
        let msg = LoadModuleMessage::from_json(&raw).unwrap();
        assert_eq!(msg.module.name(), "slideshow");
        assert_eq!(msg.time, 123456);
        assert_eq!(msg.geo.extents().fingerprint(), "0,0,1920,1080");

        let reencoded = msg.to_json().unwrap();
        assert_eq!(LoadModuleMessage::from_json(&reencoded).unwrap(), msg);
    }

    #[tokio::test(start_paused = true)]
    async fn plays_a_message_through_the_machine() {
        let registry = ModuleRegistry::new();
        registry.register(
            "modules/quiet",
            FactoryFn::arc(|_env, _cfg| Ok(Arc::new(Quiet) as _)),
        );
        let ctx = WallContext::new(
            WallConfig::default(),
            MemoryTransport::new() as _,
            registry,
            DirAssets::new("/assets"),
        );
        let player = ModulePlayer::new(Arc::clone(&ctx), Polygon::rect(0.0, 0.0, 1920.0, 1080.0));

        let msg = LoadModuleMessage {
            module: ModuleDescriptor::new(
                "quiet",
                "modules/quiet",
                Map::new(),
                Credit::default(),
            ),
            time: 500,
            geo: Polygon::rect(0.0, 0.0, 1920.0, 1080.0),
        };
        player.play(msg);

        ctx.clock.sleep_until(600).await;
        assert_eq!(ctx.stage.len(), 1);
        assert_eq!(ctx.ticker.len(), 1);
    }
}
