//! The reaction catalog: an index from reagent to the reactions it can
//! trigger.
//!
//! Each definition is filed under a single reagent, its first
//! non-catalyst reactant (or first reactant if all are catalysts), so a
//! cascade seeds candidates by looking up every reagent present in the
//! solution. Buckets are kept in evaluation order.
//!
//! [`ReactionCatalog::reload`] diffs a new definition set against the
//! current one and only touches the buckets of definitions that were
//! added, changed or removed. Unchanged definitions keep their `Arc`, so
//! ongoing reaction states referring to them survive the reload.

use std::sync::Arc;

use alembic_core::{ReactionId, ReagentId};
use indexmap::IndexMap;
use tracing::{info, warn};

use crate::definition::ReactionDefinition;
use crate::error::DefinitionError;

/// Result of [`ReactionCatalog::index`].
#[derive(Debug, Default)]
pub struct IndexReport {
    /// Definitions accepted into the catalog.
    pub indexed: usize,
    /// Definitions rejected, with the reason.
    pub rejected: Vec<DefinitionError>,
}

/// Result of [`ReactionCatalog::reload`].
#[derive(Debug, Default)]
pub struct ReloadSummary {
    /// Ids present only in the new set.
    pub added: Vec<ReactionId>,
    /// Ids whose definition differs between the sets.
    pub changed: Vec<ReactionId>,
    /// Ids present only in the old set.
    pub removed: Vec<ReactionId>,
    /// Definitions rejected from the new set.
    pub rejected: Vec<DefinitionError>,
    /// The old definitions of every changed or removed id. Active reaction
    /// states for these must be cancelled.
    pub evicted: Vec<Arc<ReactionDefinition>>,
}

impl ReloadSummary {
    /// Whether the reload altered the catalog.
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.changed.is_empty() && self.removed.is_empty()
    }
}

/// Index of reaction definitions keyed by trigger reagent.
#[derive(Debug, Default)]
pub struct ReactionCatalog {
    definitions: IndexMap<ReactionId, Arc<ReactionDefinition>>,
    by_reagent: IndexMap<ReagentId, Vec<Arc<ReactionDefinition>>>,
}

impl ReactionCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the catalog contents with `definitions`.
    ///
    /// Invalid definitions and repeated ids are rejected and logged; the
    /// first definition with a given id wins.
    pub fn index(&mut self, definitions: impl IntoIterator<Item = ReactionDefinition>) -> IndexReport {
        let (accepted, rejected) = admit(definitions);
        self.definitions.clear();
        self.by_reagent.clear();
        let indexed = accepted.len();
        for def in accepted.into_values() {
            self.insert(Arc::new(def));
        }
        IndexReport { indexed, rejected }
    }

    /// Swap in a new definition set, re-indexing only what changed.
    pub fn reload(&mut self, definitions: impl IntoIterator<Item = ReactionDefinition>) -> ReloadSummary {
        let (mut incoming, rejected) = admit(definitions);
        let mut summary = ReloadSummary {
            rejected,
            ..ReloadSummary::default()
        };

        let stale: Vec<ReactionId> = self
            .definitions
            .iter()
            .filter(|&(id, old)| incoming.get(id).is_none_or(|new| new != &**old))
            .map(|(id, _)| id.clone())
            .collect();
        for id in stale {
            if let Some(old) = self.remove(&id) {
                if incoming.contains_key(&id) {
                    summary.changed.push(id);
                } else {
                    summary.removed.push(id);
                }
                summary.evicted.push(old);
            }
        }

        incoming.retain(|id, _| !self.definitions.contains_key(id));
        for (id, def) in incoming {
            if !summary.changed.contains(&id) {
                summary.added.push(id);
            }
            self.insert(Arc::new(def));
        }

        info!(
            added = summary.added.len(),
            changed = summary.changed.len(),
            removed = summary.removed.len(),
            rejected = summary.rejected.len(),
            "reaction catalog reloaded"
        );
        summary
    }

    /// Reactions triggered by `reagent`, in evaluation order.
    pub fn lookup(&self, reagent: &str) -> &[Arc<ReactionDefinition>] {
        self.by_reagent
            .get(reagent)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// A definition by id.
    pub fn get(&self, id: &str) -> Option<&Arc<ReactionDefinition>> {
        self.definitions.get(id)
    }

    /// Whether `id` is indexed.
    pub fn contains(&self, id: &str) -> bool {
        self.definitions.contains_key(id)
    }

    /// Number of indexed definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// All definitions.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ReactionDefinition>> {
        self.definitions.values()
    }

    fn insert(&mut self, def: Arc<ReactionDefinition>) {
        if let Some(reagent) = def.index_reagent() {
            let bucket = self.by_reagent.entry(reagent.clone()).or_default();
            let order = def.order();
            let at = bucket.partition_point(|d| d.order() < order);
            bucket.insert(at, Arc::clone(&def));
        }
        self.definitions.insert(def.id().clone(), def);
    }

    fn remove(&mut self, id: &ReactionId) -> Option<Arc<ReactionDefinition>> {
        let def = self.definitions.shift_remove(id)?;
        if let Some(reagent) = def.index_reagent() {
            if let Some(bucket) = self.by_reagent.get_mut(reagent.as_str()) {
                bucket.retain(|d| d.id() != id);
                if bucket.is_empty() {
                    self.by_reagent.shift_remove(reagent.as_str());
                }
            }
        }
        Some(def)
    }
}

/// Validated definitions keyed by id, in input order. The first definition
/// with a given id wins.
fn admit(
    definitions: impl IntoIterator<Item = ReactionDefinition>,
) -> (IndexMap<ReactionId, ReactionDefinition>, Vec<DefinitionError>) {
    let mut accepted: IndexMap<ReactionId, ReactionDefinition> = IndexMap::new();
    let mut rejected = Vec::new();
    for def in definitions {
        let verdict = if accepted.contains_key(def.id()) {
            Err(DefinitionError::DuplicateId {
                reaction: def.id().clone(),
            })
        } else {
            def.validate()
        };
        match verdict {
            Ok(()) => {
                accepted.insert(def.id().clone(), def);
            }
            Err(e) => {
                warn!(reaction = %def.id(), error = %e, "reaction definition rejected");
                rejected.push(e);
            }
        }
    }
    (accepted, rejected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_core::{Quantity, Reagent, ReagentRegistry};

    fn registry() -> ReagentRegistry {
        ["a", "b", "c", "pt"].into_iter().map(Reagent::from).collect()
    }

    fn def(id: &str, from: &str, to: &str, priority: i32) -> ReactionDefinition {
        ReactionDefinition::builder(id)
            .reactant(from, Quantity::new(1))
            .product(to, Quantity::new(1))
            .priority(priority)
            .build(&registry())
            .unwrap()
    }

    fn ids(defs: &[Arc<ReactionDefinition>]) -> Vec<&str> {
        defs.iter().map(|d| d.id().as_str()).collect()
    }

    #[test]
    fn lookup_is_keyed_by_first_consumed_reactant() {
        let catalyzed = ReactionDefinition::builder("cat")
            .catalyst("pt", Quantity::new(1))
            .reactant("b", Quantity::new(1))
            .product("c", Quantity::new(1))
            .build(&registry())
            .unwrap();
        let mut catalog = ReactionCatalog::new();
        let report = catalog.index([def("a_to_b", "a", "b", 0), catalyzed]);
        assert_eq!(report.indexed, 2);
        assert_eq!(ids(catalog.lookup("a")), ["a_to_b"]);
        assert_eq!(ids(catalog.lookup("b")), ["cat"]);
        assert!(catalog.lookup("pt").is_empty());
    }

    #[test]
    fn buckets_are_in_priority_then_id_order() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([
            def("z", "a", "b", 0),
            def("m", "a", "b", 10),
            def("b", "a", "c", 0),
        ]);
        assert_eq!(ids(catalog.lookup("a")), ["m", "b", "z"]);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let mut catalog = ReactionCatalog::new();
        let report = catalog.index([def("r", "a", "b", 0), def("r", "b", "c", 0)]);
        assert_eq!(report.indexed, 1);
        assert!(matches!(report.rejected[..], [DefinitionError::DuplicateId { .. }]));
        assert_eq!(ids(catalog.lookup("a")), ["r"]);
    }

    #[test]
    fn large_set_with_repeats_keeps_first_of_each_id() {
        let defs = (0..2000).map(|i| def(&format!("r{}", i % 500), "a", "b", i));
        let mut catalog = ReactionCatalog::new();
        let report = catalog.index(defs);
        assert_eq!(report.indexed, 500);
        assert_eq!(report.rejected.len(), 1500);
        assert_eq!(catalog.get("r7").unwrap().priority(), 7);
        assert!(catalog.reload((0..500).map(|i| def(&format!("r{i}"), "a", "b", i))).is_noop());
    }

    #[test]
    fn reload_diffs_definitions() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([
            def("keep", "a", "b", 0),
            def("change", "a", "c", 0),
            def("drop", "b", "c", 0),
        ]);
        let kept = Arc::clone(catalog.get("keep").unwrap());

        let summary = catalog.reload([
            def("keep", "a", "b", 0),
            def("change", "c", "a", 0),
            def("new", "b", "a", 0),
        ]);
        assert_eq!(summary.added, [ReactionId::new("new")]);
        assert_eq!(summary.changed, [ReactionId::new("change")]);
        assert_eq!(summary.removed, [ReactionId::new("drop")]);
        assert_eq!(summary.evicted.len(), 2);
        assert!(!summary.is_noop());

        assert!(Arc::ptr_eq(&kept, catalog.get("keep").unwrap()));
        assert_eq!(ids(catalog.lookup("a")), ["keep"]);
        assert_eq!(ids(catalog.lookup("b")), ["new"]);
        assert_eq!(ids(catalog.lookup("c")), ["change"]);
        assert_eq!(catalog.len(), 3);
    }

    #[test]
    fn reload_with_identical_set_is_noop() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([def("r", "a", "b", 0)]);
        let summary = catalog.reload([def("r", "a", "b", 0)]);
        assert!(summary.is_noop());
        assert!(summary.evicted.is_empty());
    }
}
