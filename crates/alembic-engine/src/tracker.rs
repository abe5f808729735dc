//! Per-container bookkeeping of active reactions.

use std::sync::Arc;
use std::time::Duration;

use alembic_core::{ReactionId, SolutionId};
use alembic_reaction::{ReactionCatalog, ReactionDefinition, ReactionState};
use indexmap::IndexMap;

/// One active reaction: the definition it started under plus its state.
#[derive(Clone, Debug)]
pub struct ActiveReaction {
    /// The definition in force when the reaction started. If the catalog
    /// no longer holds this exact `Arc` the reaction is cancelled.
    pub definition: Arc<ReactionDefinition>,
    /// Lifecycle state.
    pub state: ReactionState,
}

impl ActiveReaction {
    /// Whether the catalog still holds this reaction's definition.
    pub fn is_current(&self, catalog: &ReactionCatalog) -> bool {
        catalog
            .get(self.definition.id().as_str())
            .is_some_and(|d| Arc::ptr_eq(d, &self.definition))
    }
}

/// Active reactions of one solution.
pub type ReactionSet = IndexMap<ReactionId, ActiveReaction>;

/// Active reactions of every solution in one container.
///
/// Created when a reaction first becomes active in one of the container's
/// solutions; the engine drops it once every set is empty.
#[derive(Clone, Debug)]
pub struct ReactionTracker {
    next_update: Duration,
    solutions: IndexMap<SolutionId, ReactionSet>,
}

impl ReactionTracker {
    /// An empty tracker first due at `next_update`.
    pub fn new(next_update: Duration) -> Self {
        Self {
            next_update,
            solutions: IndexMap::new(),
        }
    }

    /// When the scheduler next revisits this container.
    pub fn next_update(&self) -> Duration {
        self.next_update
    }

    /// Whether the container is due at `now`.
    pub fn is_due(&self, now: Duration) -> bool {
        now >= self.next_update
    }

    /// Set the next scheduled update.
    pub fn schedule(&mut self, at: Duration) {
        self.next_update = at;
    }

    /// Active reactions of a solution.
    pub fn solution(&self, id: SolutionId) -> Option<&ReactionSet> {
        self.solutions.get(&id)
    }

    /// Mutable active reactions of a solution.
    pub fn solution_mut(&mut self, id: SolutionId) -> Option<&mut ReactionSet> {
        self.solutions.get_mut(&id)
    }

    /// Take a solution's set out of the tracker.
    pub fn take(&mut self, id: SolutionId) -> Option<ReactionSet> {
        self.solutions.shift_remove(&id)
    }

    /// Store a solution's set; an empty set removes the entry.
    pub fn put(&mut self, id: SolutionId, set: ReactionSet) {
        if set.is_empty() {
            self.solutions.shift_remove(&id);
        } else {
            self.solutions.insert(id, set);
        }
    }

    /// Ids of tracked solutions.
    pub fn solution_ids(&self) -> impl Iterator<Item = SolutionId> + '_ {
        self.solutions.keys().copied()
    }

    /// Drop solutions with no active reactions.
    pub fn prune(&mut self) {
        self.solutions.retain(|_, set| !set.is_empty());
    }

    /// Whether no solution has an active reaction.
    pub fn is_empty(&self) -> bool {
        self.solutions.values().all(IndexMap::is_empty)
    }

    /// Total active reactions across all solutions.
    pub fn active_count(&self) -> usize {
        self.solutions.values().map(IndexMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_core::{Quantity, Reagent, ReagentRegistry};

    fn active(id: &str) -> (ReactionId, ActiveReaction) {
        let registry: ReagentRegistry = [Reagent::from("a")].into_iter().collect();
        let def = ReactionDefinition::builder(id)
            .reactant("a", Quantity::new(1))
            .build(&registry)
            .unwrap();
        (
            ReactionId::new(id),
            ActiveReaction {
                definition: Arc::new(def),
                state: ReactionState::new(Duration::ZERO),
            },
        )
    }

    #[test]
    fn put_empty_removes_entry() {
        let mut tracker = ReactionTracker::new(Duration::ZERO);
        tracker.put(SolutionId(0), [active("r")].into_iter().collect());
        assert_eq!(tracker.active_count(), 1);
        tracker.put(SolutionId(0), ReactionSet::new());
        assert!(tracker.is_empty());
        assert_eq!(tracker.solution_ids().count(), 0);
    }

    #[test]
    fn due_at_or_after_next_update() {
        let tracker = ReactionTracker::new(Duration::from_secs(5));
        assert!(!tracker.is_due(Duration::from_secs(4)));
        assert!(tracker.is_due(Duration::from_secs(5)));
    }

    #[test]
    fn stale_definition_is_not_current() {
        let (_, a) = active("r");
        let mut catalog = ReactionCatalog::new();
        catalog.index([(*a.definition).clone()]);
        assert!(!a.is_current(&catalog));
    }
}
