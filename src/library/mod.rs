//! Module descriptors and the library that holds them.
//!
//! A [`ModuleDescriptor`] is the immutable record a scheduler hands to a
//! region machine: which module, where its behavior comes from, its config,
//! and its attribution. The [`ModuleLibrary`] resolves raw config records
//! (including `extends` inheritance) into descriptors.

mod descriptor;
#[allow(clippy::module_inception)]
mod library;

pub use descriptor::{Credit, ModuleDescriptor, EMPTY_MODULE};
pub use library::{BrickConfig, ModuleLibrary};
