//! # Shared wiring for one wall process.
//!
//! [`WallContext`] bundles the process-wide collaborators every region
//! machine and module instance needs: the deadline clock, the stage, the
//! ticker, the transport, the behavior registry, the asset resolver, the
//! monitoring bus, and the default transition strategy.
//!
//! Region machines share the context read-only; the only shared mutable
//! pieces are the ticker (idempotent set operations) and the stage
//! (per-container ownership), per the concurrency model.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::WallConfig;
use crate::events::Bus;
use crate::modules::{AssetResolver, ModuleRegistry, ModuleTicker};
use crate::net::WallTransport;
use crate::stage::Stage;
use crate::transition::{FadeTransition, Transition};

/// Process-wide collaborators shared by all regions.
pub struct WallContext {
    /// Global configuration.
    pub config: WallConfig,
    /// The single process-wide deadline clock.
    pub clock: Clock,
    /// Monitoring bus; machines publish a record on every transition.
    pub bus: Bus,
    /// Document of drawable surfaces.
    pub stage: Arc<Stage>,
    /// Registry of currently-animating instances.
    pub ticker: ModuleTicker,
    /// Session factory for module channels and state scopes.
    pub transport: Arc<dyn WallTransport>,
    /// Load entry points for module behaviors.
    pub registry: Arc<ModuleRegistry>,
    /// Asset resolver injected into module environments.
    pub assets: Arc<dyn AssetResolver>,
    /// Transition strategy used for new placements.
    pub transition: Arc<dyn Transition>,
}

impl WallContext {
    /// Creates a context with the default opacity cross-fade transition.
    pub fn new(
        config: WallConfig,
        transport: Arc<dyn WallTransport>,
        registry: Arc<ModuleRegistry>,
        assets: Arc<dyn AssetResolver>,
    ) -> Arc<Self> {
        Self::with_transition(config, transport, registry, assets, Arc::new(FadeTransition))
    }

    /// Creates a context with a custom transition strategy.
    pub fn with_transition(
        config: WallConfig,
        transport: Arc<dyn WallTransport>,
        registry: Arc<ModuleRegistry>,
        assets: Arc<dyn AssetResolver>,
        transition: Arc<dyn Transition>,
    ) -> Arc<Self> {
        let bus = Bus::new(config.bus_capacity_clamped());
        Arc::new(Self {
            config,
            clock: Clock::start(),
            bus,
            stage: Arc::new(Stage::new()),
            ticker: ModuleTicker::new(),
            transport,
            registry,
            assets,
            transition,
        })
    }
}
