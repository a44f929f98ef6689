//! Module runtime: the behavior contract, the loaded-module registry, the
//! per-placement [`RunningModule`] lifecycle object, the per-frame ticker,
//! and the title card.
//!
//! Internal structure:
//! - [`behavior`]: the capability set a module implements + the factory
//!   registry that "loads" behaviors by name;
//! - [`instance`]: one attempted placement of a descriptor on a region,
//!   owning its container, network channel, and state scope;
//! - [`ticker`]: registry of currently-animating instances receiving
//!   per-frame time callbacks;
//! - [`title_card`]: attribution card shown around a module's content.

mod behavior;
mod instance;
mod ticker;
mod title_card;

pub use behavior::{
    AssetResolver, DirAssets, FactoryFn, ModuleBehavior, ModuleEnv, ModuleFactory, ModuleRegistry,
};
pub use instance::RunningModule;
pub use ticker::ModuleTicker;
pub use title_card::TitleCard;
