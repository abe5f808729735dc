//! The cascade driver: runs one solution's reactions to a fixed point.
//!
//! Candidates are seeded from the catalog entries of every reagent present
//! plus the solution's active reactions, and kept in evaluation order
//! (priority descending, then id). Each pass evaluates every candidate
//! once; blocked candidates leave the set and products pull in the
//! reactions they trigger. The cascade ends on the first pass that changes
//! nothing, or at the iteration cap.
//!
//! Reactions left `Stopping` after the last pass are stopped (their stop
//! effects run) and removed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use alembic_core::{Quantity, ReagentId, Solution, SolutionKey};
use alembic_reaction::{
    can_react, AdvanceOutcome, AttemptListener, EffectScope, Evaluation, LifecycleContext,
    MixingState,
    ReactionCatalog, ReactionDefinition, ReactionOrder, ReactionPhase, ReactionState, Viability,
};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use tracing::error;

use crate::tracker::{ActiveReaction, ReactionSet};

/// A cascade that hit the iteration cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvergenceFailure {
    /// The solution whose reaction graph did not settle.
    pub key: SolutionKey,
    /// Passes run before giving up.
    pub passes: u32,
}

/// What one cascade did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CascadeReport {
    /// Passes run.
    pub passes: u32,
    /// Reactions started.
    pub started: u32,
    /// Steps that transferred mass.
    pub stepped: u32,
    /// Transitions into `Paused`.
    pub paused: u32,
    /// Reactions stopped after the last pass.
    pub stopped: u32,
    /// Reactions cancelled because their definition changed.
    pub cancelled: u32,
    /// Sum of transferred reaction extents.
    pub extent: Quantity,
    /// Volume discarded as overflow.
    pub overflow_discarded: Quantity,
    /// Reactant removals the mutator had to clamp. Always zero unless the
    /// evaluator let a step overdraw.
    pub underflows: u32,
    /// Set if the iteration cap was reached.
    pub convergence: Option<ConvergenceFailure>,
}

impl CascadeReport {
    fn record(&mut self, outcome: &AdvanceOutcome) {
        if outcome.started {
            self.started += 1;
        }
        if outcome.transferred.is_positive() {
            self.stepped += 1;
            self.extent += outcome.transferred;
        }
        if outcome.transition == Some(ReactionPhase::Paused) {
            self.paused += 1;
        }
        self.overflow_discarded += outcome.mutation.overflow_discarded;
        self.underflows += outcome.mutation.underflows.len() as u32;
    }
}

/// Shared inputs for cascading one or more solutions of a container.
pub struct Cascade<'a> {
    /// Reaction definitions.
    pub catalog: &'a ReactionCatalog,
    /// Veto hooks.
    pub listeners: &'a [Box<dyn AttemptListener>],
    /// Mixing active on the container.
    pub mixing: &'a MixingState,
    /// Current simulation time.
    pub now: Duration,
    /// Maximum passes.
    pub max_iterations: u32,
    /// Which effects transitions run.
    pub scope: EffectScope,
}

impl Cascade<'_> {
    /// Run the cascade for one solution.
    ///
    /// `active` is updated in place: started reactions are added, stopped
    /// or cancelled ones removed. With `rng = None` no effects run.
    pub fn run(
        &self,
        key: SolutionKey,
        solution: &mut Solution,
        active: &mut ReactionSet,
        rng: Option<&mut ChaCha8Rng>,
    ) -> CascadeReport {
        let mut report = CascadeReport::default();
        let mut ctx = LifecycleContext {
            key,
            now: self.now,
            rng,
            scope: self.scope,
        };

        active.retain(|_, a| {
            if a.is_current(self.catalog) {
                return true;
            }
            a.state.cancel(&a.definition, solution, &mut ctx);
            report.cancelled += 1;
            false
        });

        let mut candidates: BTreeMap<ReactionOrder, Arc<ReactionDefinition>> = BTreeMap::new();
        for reagent in solution.reagent_ids() {
            self.seed(&mut candidates, reagent);
        }
        for a in active.values() {
            candidates
                .entry(a.definition.order())
                .or_insert_with(|| Arc::clone(&a.definition));
        }

        let mut converged = false;
        while report.passes < self.max_iterations {
            report.passes += 1;
            let mut changed = false;
            let mut blocked: SmallVec<[ReactionOrder; 8]> = SmallVec::new();
            let mut produced: SmallVec<[ReagentId; 8]> = SmallVec::new();

            for (order, def) in &candidates {
                let viability = can_react(&Evaluation {
                    key,
                    definition: def,
                    solution,
                    state: active.get(def.id()).map(|a| &a.state),
                    mixing: self.mixing,
                    now: self.now,
                    listeners: self.listeners,
                });

                let outcome = if let Some(a) = active.get_mut(def.id()) {
                    a.state.advance(def, solution, &viability, &mut ctx)
                } else if let Viability::Ready(amount) = viability {
                    let (state, outcome) = ReactionState::begin(def, solution, amount, &mut ctx);
                    active.insert(
                        def.id().clone(),
                        ActiveReaction {
                            definition: Arc::clone(def),
                            state,
                        },
                    );
                    outcome
                } else {
                    AdvanceOutcome::default()
                };

                if viability.is_blocked() {
                    blocked.push(order.clone());
                }
                changed |= outcome.changed();
                report.record(&outcome);
                produced.extend(outcome.produced);
            }

            for order in &blocked {
                candidates.remove(order);
            }
            for reagent in &produced {
                self.seed(&mut candidates, reagent);
            }

            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            error!(
                container = %key.container,
                solution = %key.solution,
                cap = self.max_iterations,
                "reaction cascade did not converge; keeping partial results"
            );
            report.convergence = Some(ConvergenceFailure {
                key,
                passes: report.passes,
            });
        }

        active.retain(|_, a| {
            if a.state.phase != ReactionPhase::Stopping {
                return true;
            }
            a.state.stop(&a.definition, solution, &mut ctx);
            report.stopped += 1;
            false
        });

        report
    }

    fn seed(
        &self,
        candidates: &mut BTreeMap<ReactionOrder, Arc<ReactionDefinition>>,
        reagent: &ReagentId,
    ) {
        for def in self.catalog.lookup(reagent.as_str()) {
            candidates
                .entry(def.order())
                .or_insert_with(|| Arc::clone(def));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alembic_core::{Reagent, ReagentRegistry};

    fn registry() -> ReagentRegistry {
        ["a", "b", "c"].into_iter().map(Reagent::from).collect()
    }

    fn convert(id: &str, from: &str, to: &str) -> ReactionDefinition {
        ReactionDefinition::builder(id)
            .reactant(from, Quantity::new(1))
            .product(to, Quantity::new(1))
            .build(&registry())
            .unwrap()
    }

    fn run(catalog: &ReactionCatalog, solution: &mut Solution, active: &mut ReactionSet) -> CascadeReport {
        let mixing = MixingState::none();
        let cascade = Cascade {
            catalog,
            listeners: &[],
            mixing: &mixing,
            now: Duration::ZERO,
            max_iterations: 20,
            scope: EffectScope::All,
        };
        cascade.run(SolutionKey::new(1u64, 0u32), solution, active, None)
    }

    #[test]
    fn products_seed_follow_on_reactions() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([convert("a_to_b", "a", "b"), convert("b_to_c", "b", "c")]);
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&Reagent::from("a"), Quantity::new(10));
        let mut active = ReactionSet::new();

        let report = run(&catalog, &mut s, &mut active);
        assert!(report.convergence.is_none());
        assert_eq!(s.quantity("a"), Quantity::ZERO);
        assert_eq!(s.quantity("b"), Quantity::ZERO);
        assert_eq!(s.quantity("c"), Quantity::new(10));
        assert_eq!(report.started, 2);
        assert_eq!(report.stopped, 2);
        assert!(active.is_empty());
    }

    #[test]
    fn cycle_hits_the_cap_and_keeps_partial_results() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([convert("a_to_b", "a", "b"), convert("b_to_a", "b", "a")]);
        let mut s = Solution::new(Quantity::new(100)).with_reagent(&Reagent::from("a"), Quantity::new(10));
        let mut active = ReactionSet::new();

        let report = run(&catalog, &mut s, &mut active);
        assert_eq!(report.passes, 20);
        assert_eq!(
            report.convergence,
            Some(ConvergenceFailure {
                key: SolutionKey::new(1u64, 0u32),
                passes: 20
            })
        );
        assert_eq!(s.volume(), Quantity::new(10));
    }

    #[test]
    fn stale_states_are_cancelled_first() {
        let mut catalog = ReactionCatalog::new();
        catalog.index([convert("a_to_b", "a", "b")]);
        let stale = Arc::new(convert("a_to_b", "a", "b"));
        let mut active: ReactionSet = [(
            stale.id().clone(),
            ActiveReaction {
                definition: stale,
                state: ReactionState::new(Duration::ZERO),
            },
        )]
        .into_iter()
        .collect();
        let mut s = Solution::new(Quantity::new(100));

        let report = run(&catalog, &mut s, &mut active);
        assert_eq!(report.cancelled, 1);
        assert!(active.is_empty());
    }
}
