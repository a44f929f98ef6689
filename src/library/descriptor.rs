//! # Immutable description of a loadable module.
//!
//! A [`ModuleDescriptor`] is created once by config loading and never
//! mutated afterwards. The reserved name [`EMPTY_MODULE`] (`"_empty"`)
//! means "blank, no content": its path is empty and every lifecycle call on
//! an instance of it is a no-op. That is the mechanism for blank-screen
//! placements.
//!
//! ## Invariant
//! Every non-empty descriptor has a non-empty path; [`ModuleDescriptor::new`]
//! debug-asserts it and [`ModuleDescriptor::is_empty`] treats a pathless
//! descriptor as blank.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Reserved module name for blank placements.
pub const EMPTY_MODULE: &str = "_empty";

/// Attribution shown on a module's title card.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credit {
    /// A title with an optional author.
    Title {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        author: Option<String>,
    },
    /// An attribution image.
    Image { image: String },
}

impl Default for Credit {
    fn default() -> Self {
        Credit::Title {
            title: String::new(),
            author: None,
        }
    }
}

/// Immutable record describing a loadable module.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    name: String,
    path: String,
    #[serde(default)]
    config: Map<String, Value>,
    #[serde(default)]
    credit: Credit,
}

impl ModuleDescriptor {
    /// Creates a descriptor for a real (non-blank) module.
    ///
    /// Debug builds assert that a non-blank descriptor carries a path. In
    /// release builds (and for records arriving off the wire, which skip
    /// this constructor) a pathless descriptor is not rejected:
    /// [`ModuleDescriptor::is_empty`] treats it as blank, so it can never
    /// reach a load attempt.
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        config: Map<String, Value>,
        credit: Credit,
    ) -> Self {
        let name = name.into();
        let path = path.into();
        debug_assert!(
            name == EMPTY_MODULE || !path.is_empty(),
            "non-empty descriptor requires a path"
        );
        Self {
            name,
            path,
            config,
            credit,
        }
    }

    /// The blank sentinel descriptor.
    pub fn empty() -> Self {
        Self {
            name: EMPTY_MODULE.to_string(),
            path: String::new(),
            config: Map::new(),
            credit: Credit::default(),
        }
    }

    /// Module name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path to the module's behavior (registry key or plugin path).
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Module configuration.
    pub fn config(&self) -> &Map<String, Value> {
        &self.config
    }

    /// Attribution metadata.
    pub fn credit(&self) -> &Credit {
        &self.credit
    }

    /// True for the blank sentinel (no path, no behavior).
    pub fn is_empty(&self) -> bool {
        self.name == EMPTY_MODULE || self.path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sentinel_has_no_path() {
        let empty = ModuleDescriptor::empty();
        assert!(empty.is_empty());
        assert_eq!(empty.name(), EMPTY_MODULE);
        assert_eq!(empty.path(), "");
    }

    #[test]
    fn pathless_wire_record_degrades_to_blank() {
        let desc: ModuleDescriptor =
            serde_json::from_str(r#"{"name":"ghost","path":""}"#).unwrap();
        assert!(desc.is_empty());
    }

    #[test]
    fn credit_union_accepts_both_shapes() {
        let by_title: Credit =
            serde_json::from_str(r#"{"title":"Clock","author":"ada"}"#).unwrap();
        assert_eq!(
            by_title,
            Credit::Title {
                title: "Clock".into(),
                author: Some("ada".into())
            }
        );
        let by_image: Credit = serde_json::from_str(r#"{"image":"logo.png"}"#).unwrap();
        assert_eq!(
            by_image,
            Credit::Image {
                image: "logo.png".into()
            }
        );
    }

    #[test]
    fn descriptor_survives_the_wire() {
        let mut config = Map::new();
        config.insert("speed".into(), Value::from(2));
        let desc = ModuleDescriptor::new(
            "clock",
            "modules/clock",
            config,
            Credit::Title {
                title: "Clock".into(),
                author: None,
            },
        );
        let json = serde_json::to_string(&desc).unwrap();
        let back: ModuleDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
        assert!(!back.is_empty());
    }
}
