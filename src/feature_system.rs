//! The feature system: bidirectional grapheme<->feature-set mapping, and
//! the process-wide named registry of systems.
//!
//! A [`FeatureSystem`] is built once from a [`ResourceTables`] and a
//! [`Geometry`] and never mutated afterward: construct once, then share a
//! read-only reference, the same lifecycle as the `lazy_static!`-memoized
//! lookup table in [`resources`], generalized here to a named [`Registry`]
//! of systems instead of one fixed inventory.

use crate::error::UnknownSystemError;
use crate::geometry::Geometry;
use crate::resources::{self, ResourceTables};
use lazy_static::lazy_static;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

/// A single feature modifier: add or remove one feature-value label.
/// Parsed from bracketed modifier text (`[+voiced,-nasal,high]`); a bare
/// label (no sign) is treated as `Add`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    /// `+label`, or a bare `label`
    Add(String),
    /// `-label`
    Remove(String),
}

impl Modifier {
    /// Flip `+` to `-` and vice versa, for inverting a back-reference
    /// modifier when reconstructing a proto-form in [`crate::applier::backward`].
    pub fn invert(&self) -> Modifier {
        match self {
            Modifier::Add(l) => Modifier::Remove(l.clone()),
            Modifier::Remove(l) => Modifier::Add(l.clone()),
        }
    }
}

/// Parse a comma-separated modifier list (the contents of a `[...]` block,
/// without the brackets). Unrecognized syntax degrades to `Add` of the raw
/// token — modifier parsing never fails (§7: opaque pass-through).
pub fn parse_modifiers(text: &str) -> Vec<Modifier> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|tok| {
            if let Some(rest) = tok.strip_prefix('+') {
                Modifier::Add(rest.to_string())
            } else if let Some(rest) = tok.strip_prefix('-') {
                Modifier::Remove(rest.to_string())
            } else {
                Modifier::Add(tok.to_string())
            }
        })
        .collect()
}

/// Render a modifier list back to its bracket-interior text form, used
/// when reconstructing back-reference tokens during backward application.
pub fn render_modifiers(mods: &[Modifier]) -> String {
    mods.iter()
        .map(|m| match m {
            Modifier::Add(l) => format!("+{}", l),
            Modifier::Remove(l) => format!("-{}", l),
        })
        .collect::<Vec<_>>()
        .join(",")
}

/// A named, immutable feature system: the bidirectional grapheme<->feature
/// mapping rule parsing and matching are evaluated against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSystem {
    name: String,
    tables: ResourceTables,
    geometry: Geometry,
}

impl FeatureSystem {
    /// Build a system from resource tables and a geometry.
    pub fn new(name: impl Into<String>, tables: ResourceTables, geometry: Geometry) -> FeatureSystem {
        FeatureSystem {
            name: name.into(),
            tables,
            geometry,
        }
    }

    /// The embedded default system: General-American-style inventory (see
    /// [`resources::default_tables`]) over the default Clements & Hume
    /// geometry.
    pub fn default_system() -> FeatureSystem {
        FeatureSystem::new(
            "default",
            resources::default_tables().clone(),
            Geometry::default_geometry(),
        )
    }

    /// This system's registered name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The canonical feature set for a concrete grapheme, or `None` if
    /// `grapheme` is not in this system's inventory.
    pub fn grapheme_to_features(&self, grapheme: &str) -> Option<HashSet<String>> {
        self.tables.sounds.features(grapheme).cloned()
    }

    /// Whether `letter` names a sound class in this system.
    pub fn is_class(&self, letter: &str) -> bool {
        self.tables.classes.is_class(letter)
    }

    /// The required feature set for a sound class, or `None` if `letter`
    /// does not name a known class.
    pub fn class_features(&self, letter: &str) -> Option<HashSet<String>> {
        self.tables.classes.class_features(letter).cloned()
    }

    /// The grapheme whose feature set minimizes [`Geometry::sound_distance`]
    /// to `features`; ties are broken by shortest grapheme, then
    /// lexicographic order. `None` if the inventory is empty.
    pub fn features_to_grapheme(&self, features: &HashSet<String>) -> Option<String> {
        self.tables
            .sounds
            .iter()
            .map(|(g, fs)| (g, self.sound_distance(features, fs)))
            .min_by(|(g1, d1), (g2, d2)| {
                d1.partial_cmp(d2)
                    .unwrap()
                    .then_with(|| g1.chars().count().cmp(&g2.chars().count()))
                    .then_with(|| g1.cmp(g2))
            })
            .map(|(g, _)| g.to_string())
    }

    /// Apply a sequence of feature modifiers to `base`. Each `Add(label)`
    /// first removes every geometric sibling of `label` from the running
    /// set (sibling exclusivity), then inserts `label`. Each
    /// `Remove(label)` removes only `label` itself. Unknown labels pass
    /// through opaquely: a sibling-less `Add` simply inserts, a `Remove`
    /// that matches nothing is a no-op.
    pub fn add_features(&self, base: &HashSet<String>, modifiers: &[Modifier]) -> HashSet<String> {
        let mut result = base.clone();
        for modifier in modifiers {
            match modifier {
                Modifier::Add(label) => {
                    for sibling in self.geometry.siblings_of(label) {
                        result.remove(&sibling);
                    }
                    result.insert(label.clone());
                }
                Modifier::Remove(label) => {
                    result.remove(label);
                }
            }
        }
        result
    }

    /// `true` iff every label in `pattern` is in `target` — the
    /// subsumption test used for class-partial sounds.
    pub fn partial_match(&self, pattern: &HashSet<String>, target: &HashSet<String>) -> bool {
        pattern.is_subset(target)
    }

    /// Tree-edge distance between two feature labels.
    pub fn feature_distance(&self, a: &str, b: &str) -> u32 {
        self.geometry.feature_distance(a, b)
    }

    /// Weighted symmetric-difference distance between two feature sets.
    pub fn sound_distance(&self, a: &HashSet<String>, b: &HashSet<String>) -> f64 {
        self.geometry.sound_distance(a, b)
    }
}

struct Registry {
    systems: std::collections::HashMap<String, Arc<FeatureSystem>>,
    default_name: String,
}

impl Registry {
    fn with_default() -> Registry {
        let default = Arc::new(FeatureSystem::default_system());
        let mut systems = std::collections::HashMap::new();
        systems.insert(default.name().to_string(), default);
        Registry {
            systems,
            default_name: "default".to_string(),
        }
    }
}

lazy_static! {
    static ref REGISTRY: RwLock<Registry> = RwLock::new(Registry::with_default());
}

/// Register (or replace) a feature system under its own name.
pub fn register_system(system: FeatureSystem) {
    let mut registry = REGISTRY.write().unwrap();
    registry
        .systems
        .insert(system.name().to_string(), Arc::new(system));
}

/// Look up a feature system by name.
pub fn get_system(name: &str) -> Result<Arc<FeatureSystem>, UnknownSystemError> {
    let registry = REGISTRY.read().unwrap();
    registry
        .systems
        .get(name)
        .cloned()
        .ok_or_else(|| UnknownSystemError::new(name))
}

/// Set the process-wide default system by name. Fails if `name` was never
/// registered.
pub fn set_default(name: &str) -> Result<(), UnknownSystemError> {
    let mut registry = REGISTRY.write().unwrap();
    if !registry.systems.contains_key(name) {
        return Err(UnknownSystemError::new(name));
    }
    registry.default_name = name.to_string();
    Ok(())
}

/// The current process-wide default system.
pub fn default_system() -> Arc<FeatureSystem> {
    let registry = REGISTRY.read().unwrap();
    registry.systems[&registry.default_name].clone()
}
