//! # Module behavior contract and the registry that loads it.
//!
//! A module is arbitrary user code behind a fixed interface. The interface
//! is [`ModuleBehavior`]: a capability set of lifecycle hooks, every one of
//! which defaults to a no-op so a module only implements what it needs.
//! The one thing a module cannot omit is its load entry point: a
//! [`ModuleFactory`] registered under the module's path in the
//! [`ModuleRegistry`]. "Loading" a module is a registry lookup followed by
//! the factory call — a missing registration fails instantiation with
//! [`WallError::Load`].
//!
//! ## Hook contract
//! ```text
//! load ─► will_be_shown_soon ─► begin_fade_in ─► finish_fade_in
//!            (may fail:              (may fail:      │
//!             abandon module)         never show)    ▼  (display, tick…)
//!         will_be_hidden_soon ─► begin_fade_out ─► finish_fade_out
//! ```
//! `will_be_shown_soon` and `begin_fade_in` failures dispose the instance;
//! the finish hooks and the out path are assumed non-failing (reported,
//! not retried).

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::WallError;
use crate::geometry::Polygon;
use crate::net::{NetworkChannel, StateScope};
use crate::stage::ContainerId;

use super::title_card::TitleCard;

/// The capability set a running module may implement.
///
/// Hooks receive absolute deadlines in clock milliseconds. A hook the
/// module does not override is a no-op.
#[async_trait]
pub trait ModuleBehavior: Send + Sync + 'static {
    /// The module will be faded in at `deadline`; prepare content in the
    /// given container. Failing here abandons the module before it is ever
    /// shown.
    async fn will_be_shown_soon(
        &self,
        _container: ContainerId,
        _deadline: u64,
    ) -> Result<(), WallError> {
        Ok(())
    }

    /// The cross-fade towards this module has begun and completes by
    /// `deadline`. Failing here prevents the module from being shown.
    fn begin_fade_in(&self, _deadline: u64) -> Result<(), WallError> {
        Ok(())
    }

    /// The fade-in window closed; the module is fully visible.
    fn finish_fade_in(&self) {}

    /// The module will be hidden at `deadline`.
    fn will_be_hidden_soon(&self, _deadline: u64) {}

    /// The cross-fade away from this module has begun and completes by
    /// `deadline`.
    fn begin_fade_out(&self, _deadline: u64) {}

    /// The fade-out window closed; the module is no longer visible.
    fn finish_fade_out(&self) {}

    /// Per-frame callback while the module is registered with the ticker.
    fn tick(&self, _now: u64, _delta_ms: u64) {}
}

/// Resolves asset references for module code.
pub trait AssetResolver: Send + Sync {
    /// Resolves a module-relative asset path to an absolute location.
    fn resolve(&self, path: &str) -> String;
}

/// Resolves assets against a fixed root directory or URL prefix.
pub struct DirAssets {
    root: String,
}

impl DirAssets {
    /// Creates a resolver rooted at `root` (no trailing slash required).
    pub fn new(root: impl Into<String>) -> Arc<Self> {
        let mut root = root.into();
        while root.ends_with('/') {
            root.pop();
        }
        Arc::new(Self { root })
    }
}

impl AssetResolver for DirAssets {
    fn resolve(&self, path: &str) -> String {
        format!("{}/{}", self.root, path.trim_start_matches('/'))
    }
}

/// The environment injected into a module when it loads.
///
/// Everything a module may touch outside its own code: its region, its
/// open sessions, its title card, the asset resolver, and the tracing
/// target its logs should use.
pub struct ModuleEnv {
    /// Geometry of the region the module is placed on.
    pub geometry: Polygon,
    /// The module's open network channel.
    pub network: Arc<dyn NetworkChannel>,
    /// The module's open shared-state scope.
    pub state: Arc<dyn StateScope>,
    /// The module's title card.
    pub title_card: Arc<TitleCard>,
    /// Asset resolver.
    pub assets: Arc<dyn AssetResolver>,
    /// Tracing target for the module's own logging
    /// (`wall:module:<name>`).
    pub log_target: String,
}

/// Load entry point for one module path.
#[async_trait]
pub trait ModuleFactory: Send + Sync {
    /// Builds the module's behavior from its environment and config.
    async fn load(
        &self,
        env: ModuleEnv,
        config: &Map<String, Value>,
    ) -> Result<Arc<dyn ModuleBehavior>, WallError>;
}

/// Function-backed [`ModuleFactory`], the common case for built-in
/// modules.
pub struct FactoryFn<F> {
    f: F,
}

impl<F> FactoryFn<F>
where
    F: Fn(ModuleEnv, &Map<String, Value>) -> Result<Arc<dyn ModuleBehavior>, WallError>
        + Send
        + Sync
        + 'static,
{
    /// Wraps a closure as a shareable factory.
    pub fn arc(f: F) -> Arc<dyn ModuleFactory> {
        Arc::new(Self { f })
    }
}

#[async_trait]
impl<F> ModuleFactory for FactoryFn<F>
where
    F: Fn(ModuleEnv, &Map<String, Value>) -> Result<Arc<dyn ModuleBehavior>, WallError>
        + Send
        + Sync
        + 'static,
{
    async fn load(
        &self,
        env: ModuleEnv,
        config: &Map<String, Value>,
    ) -> Result<Arc<dyn ModuleBehavior>, WallError> {
        (self.f)(env, config)
    }
}

/// Registry mapping module paths to their load entry points.
#[derive(Default)]
pub struct ModuleRegistry {
    factories: RwLock<HashMap<String, Arc<dyn ModuleFactory>>>,
}

impl ModuleRegistry {
    /// Creates an empty registry.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Registers the factory for a module path. A later registration for
    /// the same path replaces the earlier one.
    pub fn register(&self, path: impl Into<String>, factory: Arc<dyn ModuleFactory>) {
        self.factories.write().unwrap().insert(path.into(), factory);
    }

    /// Loads the behavior registered under `path`.
    ///
    /// A path with no registration is the moral equivalent of a module
    /// that did not export a load entry point.
    pub async fn load(
        &self,
        module: &str,
        path: &str,
        env: ModuleEnv,
        config: &Map<String, Value>,
    ) -> Result<Arc<dyn ModuleBehavior>, WallError> {
        let factory = {
            let factories = self.factories.read().unwrap();
            factories.get(path).cloned()
        };
        match factory {
            Some(factory) => factory.load(env, config).await,
            None => Err(WallError::load(
                module,
                format!("no load entry point registered for path '{path}'"),
            )),
        }
    }
}
