//! Reagents and the registry of their physical properties.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::id::ReagentId;

/// A named chemical substance.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reagent {
    /// Unique reagent id.
    pub id: ReagentId,
    /// Heat capacity per unit of reagent (J/K per unit).
    #[serde(default = "default_specific_heat")]
    pub specific_heat: f32,
}

fn default_specific_heat() -> f32 {
    1.0
}

impl Reagent {
    /// Create a reagent with the given specific heat.
    pub fn new(id: impl Into<ReagentId>, specific_heat: f32) -> Self {
        Self {
            id: id.into(),
            specific_heat,
        }
    }
}

impl From<&str> for Reagent {
    fn from(id: &str) -> Self {
        Self::new(id, default_specific_heat())
    }
}

/// Lookup table of known reagents.
///
/// Consulted when reaction definitions are built, so that derived
/// properties (heat-capacity delta, per-product specific heats) are
/// computed once rather than on every reaction step.
#[derive(Clone, Debug, Default)]
pub struct ReagentRegistry {
    reagents: IndexMap<ReagentId, Reagent>,
}

impl ReagentRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a reagent. Returns the previous entry, if any.
    pub fn insert(&mut self, reagent: Reagent) -> Option<Reagent> {
        self.reagents.insert(reagent.id.clone(), reagent)
    }

    /// Look up a reagent by id.
    pub fn get(&self, id: &str) -> Option<&Reagent> {
        self.reagents.get(id)
    }

    /// Specific heat of a reagent, if registered.
    pub fn specific_heat(&self, id: &str) -> Option<f32> {
        self.get(id).map(|r| r.specific_heat)
    }

    /// Whether the registry knows `id`.
    pub fn contains(&self, id: &str) -> bool {
        self.reagents.contains_key(id)
    }

    /// Number of registered reagents.
    pub fn len(&self) -> usize {
        self.reagents.len()
    }

    /// Whether no reagents are registered.
    pub fn is_empty(&self) -> bool {
        self.reagents.is_empty()
    }

    /// Iterate over registered reagents in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Reagent> {
        self.reagents.values()
    }
}

impl FromIterator<Reagent> for ReagentRegistry {
    fn from_iter<I: IntoIterator<Item = Reagent>>(iter: I) -> Self {
        let mut registry = Self::new();
        for reagent in iter {
            registry.insert(reagent);
        }
        registry
    }
}
