//! # Library of known module descriptors.
//!
//! The [`ModuleLibrary`] turns raw [`BrickConfig`] records into
//! [`ModuleDescriptor`]s. A record may `extends` a base module: the child
//! inherits the base's path, merges its own config over the base's, and
//! keeps its own credit. A record extending an unknown base is logged and
//! skipped rather than failing the whole load.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::error;

use super::descriptor::{Credit, ModuleDescriptor};

/// Raw module record as it appears in wall configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct BrickConfig {
    /// Unique module name.
    pub name: String,
    /// Name of a base module to inherit path and config from.
    #[serde(default)]
    pub extends: Option<String>,
    /// Path to the module's behavior. Ignored when `extends` is set.
    #[serde(default)]
    pub path: String,
    /// Module configuration, merged over the base's when extending.
    #[serde(default)]
    pub config: Map<String, Value>,
    /// Attribution metadata.
    #[serde(default)]
    pub credit: Credit,
}

/// Registry of descriptors keyed by module name.
#[derive(Debug, Default)]
pub struct ModuleLibrary {
    defs: HashMap<String, ModuleDescriptor>,
}

impl ModuleLibrary {
    /// Creates an empty library.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves configs into descriptors.
    ///
    /// Base modules (no `extends`) are registered first, then extension
    /// modules are resolved against them. Extensions of unknown bases are
    /// skipped with an error log.
    pub fn load_all(&mut self, configs: &[BrickConfig]) {
        for config in configs.iter().filter(|c| c.extends.is_none()) {
            self.defs.insert(
                config.name.clone(),
                ModuleDescriptor::new(
                    config.name.clone(),
                    config.path.clone(),
                    config.config.clone(),
                    config.credit.clone(),
                ),
            );
        }

        for config in configs.iter().filter(|c| c.extends.is_some()) {
            let base_name = config.extends.as_deref().unwrap();
            let Some(base) = self.defs.get(base_name) else {
                error!(
                    module = %config.name,
                    base = %base_name,
                    "module extends a base that cannot be found; skipping"
                );
                continue;
            };
            let mut merged = base.config().clone();
            for (k, v) in &config.config {
                merged.insert(k.clone(), v.clone());
            }
            let descriptor = ModuleDescriptor::new(
                config.name.clone(),
                base.path().to_string(),
                merged,
                config.credit.clone(),
            );
            self.defs.insert(config.name.clone(), descriptor);
        }
    }

    /// Looks up a descriptor by name.
    pub fn get(&self, name: &str) -> Option<&ModuleDescriptor> {
        self.defs.get(name)
    }

    /// Number of registered descriptors.
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// True when no descriptors are registered.
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Iterates over all registered descriptors.
    pub fn iter(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.defs.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configs() -> Vec<BrickConfig> {
        serde_json::from_str(
            r#"[
                {"name": "carousel", "path": "modules/carousel",
                 "config": {"period": 10, "shuffle": true},
                 "credit": {"title": "Carousel"}},
                {"name": "fast_carousel", "extends": "carousel",
                 "config": {"period": 2},
                 "credit": {"title": "Fast Carousel", "author": "ada"}},
                {"name": "orphan", "extends": "missing_base"}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn extension_inherits_path_and_merges_config() {
        let mut lib = ModuleLibrary::new();
        lib.load_all(&configs());

        let fast = lib.get("fast_carousel").unwrap();
        assert_eq!(fast.path(), "modules/carousel");
        assert_eq!(fast.config()["period"], Value::from(2));
        assert_eq!(fast.config()["shuffle"], Value::from(true));
        assert_eq!(
            fast.credit(),
            &Credit::Title {
                title: "Fast Carousel".into(),
                author: Some("ada".into())
            }
        );
    }

    #[test]
    fn unknown_base_is_skipped_not_fatal() {
        let mut lib = ModuleLibrary::new();
        lib.load_all(&configs());
        assert!(lib.get("orphan").is_none());
        assert_eq!(lib.len(), 2);
    }
}
