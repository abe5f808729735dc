//! The boundary between the engine and the simulation that owns solutions.
//!
//! The engine never owns solutions. Each update borrows them from a
//! [`ReactionHost`], together with the mixing state of their container.
//! [`SolutionTable`] is a simple in-memory host for tools and tests.

use alembic_core::{ContainerId, Solution, SolutionKey};
use alembic_reaction::MixingState;
use indexmap::IndexMap;

/// Access to host-owned solutions and mixer state.
pub trait ReactionHost {
    /// The solution at `key`, if it still exists.
    fn solution_mut(&mut self, key: SolutionKey) -> Option<&mut Solution>;

    /// Mixing categories currently active on `container`.
    fn mixing_state(&self, container: ContainerId) -> MixingState;
}

/// An in-memory [`ReactionHost`].
#[derive(Clone, Debug, Default)]
pub struct SolutionTable {
    solutions: IndexMap<SolutionKey, Solution>,
    mixing: IndexMap<ContainerId, MixingState>,
}

impl SolutionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a solution, returning the one it replaced.
    pub fn insert(&mut self, key: SolutionKey, solution: Solution) -> Option<Solution> {
        self.solutions.insert(key, solution)
    }

    /// The solution at `key`.
    pub fn get(&self, key: SolutionKey) -> Option<&Solution> {
        self.solutions.get(&key)
    }

    /// Mutable access to the solution at `key`.
    pub fn get_mut(&mut self, key: SolutionKey) -> Option<&mut Solution> {
        self.solutions.get_mut(&key)
    }

    /// Remove a solution.
    pub fn remove(&mut self, key: SolutionKey) -> Option<Solution> {
        self.solutions.shift_remove(&key)
    }

    /// Remove every solution of `container` and its mixing state.
    pub fn remove_container(&mut self, container: ContainerId) {
        self.solutions.retain(|k, _| k.container != container);
        self.mixing.shift_remove(&container);
    }

    /// Mutable mixing state of `container`, created idle on first use.
    pub fn mixing_mut(&mut self, container: ContainerId) -> &mut MixingState {
        self.mixing.entry(container).or_default()
    }

    /// Number of stored solutions.
    pub fn len(&self) -> usize {
        self.solutions.len()
    }

    /// Whether no solutions are stored.
    pub fn is_empty(&self) -> bool {
        self.solutions.is_empty()
    }

    /// Iterate stored solutions.
    pub fn iter(&self) -> impl Iterator<Item = (&SolutionKey, &Solution)> {
        self.solutions.iter()
    }
}

impl ReactionHost for SolutionTable {
    fn solution_mut(&mut self, key: SolutionKey) -> Option<&mut Solution> {
        self.get_mut(key)
    }

    fn mixing_state(&self, container: ContainerId) -> MixingState {
        self.mixing.get(&container).cloned().unwrap_or_default()
    }
}
