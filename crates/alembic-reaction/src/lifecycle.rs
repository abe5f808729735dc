//! The per-(solution, reaction) lifecycle state machine.
//!
//! ```text
//!  (absent) ──ready──▶ Starting ──amount>0──▶ Running ◀──▶ Paused
//!                          │                     │           │
//!                          └──────blocked────────┴─▶ Stopping ─▶ Stopped
//!  (any) ──definition reloaded──▶ Cancelled
//! ```
//!
//! Transitions fire the definition's effects exactly once: start effects
//! on entering `Starting`, step effects after each mass transfer, stop
//! effects on `Stopped` or `Cancelled`. A `Stopping` reaction that becomes
//! ready again before the end of the cascade resumes as `Running`.

use std::fmt;
use std::time::Duration;

use alembic_core::{
    apply, MutationReport, ProducedReagent, Quantity, ReagentId, Solution, SolutionKey,
};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;
use tracing::{debug, trace};

use crate::definition::ReactionDefinition;
use crate::effect::{run_effects, EffectContext, EffectPhase, EffectScope};
use crate::evaluator::{supported_extent, Viability};

/// Phase of an active reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReactionPhase {
    /// Just became viable; start effects have run.
    Starting,
    /// Transferred mass on its most recent evaluation.
    Running,
    /// Viable but starved (no elapsed time, or a quantized fraction).
    Paused,
    /// Blocked; stop effects run at the end of the cascade unless it
    /// becomes viable again first.
    Stopping,
    /// Terminated normally.
    Stopped,
    /// Terminated because its definition was reloaded or removed.
    Cancelled,
}

impl ReactionPhase {
    /// Whether the phase is terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Stopped | Self::Cancelled)
    }
}

impl fmt::Display for ReactionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// Dynamic state of one reaction in one solution.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionState {
    /// Current phase.
    pub phase: ReactionPhase,
    /// When the reaction started.
    pub start_time: Duration,
    /// When the reaction was last stepped (or started).
    pub last_update: Duration,
    /// Cumulative extent, including fractions a quantized reaction has
    /// not yet transferred.
    pub total_amount: Quantity,
    /// Extent transferred by the most recent step.
    pub last_step: Quantity,
}

/// Per-call environment for lifecycle transitions.
pub struct LifecycleContext<'a> {
    /// The solution being processed.
    pub key: SolutionKey,
    /// Current simulation time.
    pub now: Duration,
    /// Source of effect randomness. `None` suppresses effects entirely.
    pub rng: Option<&'a mut ChaCha8Rng>,
    /// Which effects run when `rng` is set.
    pub scope: EffectScope,
}

/// What one lifecycle transition did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdvanceOutcome {
    /// The reaction was started by this call.
    pub started: bool,
    /// Phase after the call, if it differs from the phase before.
    pub transition: Option<ReactionPhase>,
    /// Extent transferred.
    pub transferred: Quantity,
    /// Reagents produced (for cascade seeding).
    pub produced: SmallVec<[ReagentId; 4]>,
    /// Corrections the mutator made.
    pub mutation: MutationReport,
}

impl AdvanceOutcome {
    /// Whether the call changed anything: a start, a phase change or a
    /// mass transfer.
    pub fn changed(&self) -> bool {
        self.started || self.transition.is_some() || self.transferred.is_positive()
    }
}

impl ReactionState {
    /// A fresh state in [`ReactionPhase::Starting`].
    pub fn new(now: Duration) -> Self {
        Self {
            phase: ReactionPhase::Starting,
            start_time: now,
            last_update: now,
            total_amount: Quantity::ZERO,
            last_step: Quantity::ZERO,
        }
    }

    /// Start a reaction that just became viable with extent `amount`.
    ///
    /// Runs start effects and, if `amount` is positive, steps in the same
    /// call, so an instantaneous reaction completes in one update.
    pub fn begin(
        definition: &ReactionDefinition,
        solution: &mut Solution,
        amount: Quantity,
        ctx: &mut LifecycleContext<'_>,
    ) -> (Self, AdvanceOutcome) {
        debug!(reaction = %definition.id(), solution = %ctx.key, "reaction started");
        let mut state = Self::new(ctx.now);
        fire(
            definition,
            solution,
            EffectPhase::Start,
            Quantity::ZERO,
            Duration::ZERO,
            ctx,
        );

        let mut outcome = AdvanceOutcome {
            started: true,
            ..AdvanceOutcome::default()
        };
        if amount.is_positive() {
            state.step(definition, solution, amount, ctx, &mut outcome);
        }
        (state, outcome)
    }

    /// Apply an evaluation result to an active reaction.
    pub fn advance(
        &mut self,
        definition: &ReactionDefinition,
        solution: &mut Solution,
        viability: &Viability,
        ctx: &mut LifecycleContext<'_>,
    ) -> AdvanceOutcome {
        let before = self.phase;
        let mut outcome = AdvanceOutcome::default();

        match viability {
            Viability::Blocked(reason) => {
                if self.phase != ReactionPhase::Stopping {
                    trace!(
                        reaction = %definition.id(),
                        solution = %ctx.key,
                        ?reason,
                        "reaction blocked"
                    );
                    self.phase = ReactionPhase::Stopping;
                }
            }
            Viability::Ready(amount) => {
                if amount.is_positive() {
                    self.step(definition, solution, *amount, ctx, &mut outcome);
                } else if self.phase == ReactionPhase::Stopping
                    || (self.phase == ReactionPhase::Running && ctx.now > self.last_update)
                {
                    // A reaction that already stepped at `now` stays Running
                    // through the remaining passes of the same cascade.
                    self.phase = ReactionPhase::Paused;
                }
            }
        }

        if self.phase != before {
            outcome.transition = Some(self.phase);
        }
        outcome
    }

    fn step(
        &mut self,
        definition: &ReactionDefinition,
        solution: &mut Solution,
        amount: Quantity,
        ctx: &mut LifecycleContext<'_>,
        outcome: &mut AdvanceOutcome,
    ) {
        let elapsed = ctx.now.saturating_sub(self.last_update);
        self.last_update = ctx.now;

        let transfer = if definition.quantized() {
            let old = self.total_amount.trunc();
            self.total_amount += amount;
            let due = self.total_amount.trunc() - old;
            let supported = supported_extent(definition, solution).trunc();
            if due > supported {
                // The carried fraction is forfeited once the solution can
                // no longer back it.
                self.total_amount = old + supported;
                supported
            } else {
                due
            }
        } else {
            self.total_amount += amount;
            amount
        };
        self.last_step = transfer;

        if !transfer.is_positive() {
            self.phase = ReactionPhase::Paused;
            return;
        }
        self.phase = ReactionPhase::Running;

        let consumed: SmallVec<[(ReagentId, Quantity); 4]> = definition
            .consumed()
            .map(|r| (r.reagent.clone(), r.coefficient * transfer))
            .collect();
        let produced: SmallVec<[ProducedReagent; 4]> = definition
            .products()
            .iter()
            .map(|p| ProducedReagent {
                reagent: p.reagent.clone(),
                quantity: p.coefficient * transfer,
                specific_heat: p.specific_heat,
            })
            .collect();

        let product_temperature = definition.product_temperature();
        let heat = if product_temperature.is_some() {
            0.0
        } else {
            definition.heat_delta() * transfer.to_f32()
        };
        outcome.mutation = apply(solution, &consumed, &produced, product_temperature, heat);
        outcome.transferred = transfer;
        outcome.produced = produced.into_iter().map(|p| p.reagent).collect();

        trace!(
            reaction = %definition.id(),
            solution = %ctx.key,
            amount = %transfer,
            "reaction step"
        );

        fire(definition, solution, EffectPhase::Step, transfer, elapsed, ctx);
    }

    /// Terminate a blocked reaction, running its stop effects.
    pub fn stop(
        &mut self,
        definition: &ReactionDefinition,
        solution: &mut Solution,
        ctx: &mut LifecycleContext<'_>,
    ) {
        debug!(
            reaction = %definition.id(),
            solution = %ctx.key,
            total = %self.total_amount,
            "reaction stopped"
        );
        self.phase = ReactionPhase::Stopped;
        self.finish(definition, solution, ctx);
    }

    /// Terminate a reaction whose definition changed or disappeared,
    /// running the old definition's stop effects regardless of phase.
    pub fn cancel(
        &mut self,
        definition: &ReactionDefinition,
        solution: &mut Solution,
        ctx: &mut LifecycleContext<'_>,
    ) {
        debug!(
            reaction = %definition.id(),
            solution = %ctx.key,
            phase = %self.phase,
            "reaction cancelled by reload"
        );
        self.phase = ReactionPhase::Cancelled;
        self.finish(definition, solution, ctx);
    }

    fn finish(
        &self,
        definition: &ReactionDefinition,
        solution: &mut Solution,
        ctx: &mut LifecycleContext<'_>,
    ) {
        let total_time = ctx.now.saturating_sub(self.start_time);
        fire(
            definition,
            solution,
            EffectPhase::Stop,
            self.total_amount,
            total_time,
            ctx,
        );
    }
}

fn fire(
    definition: &ReactionDefinition,
    solution: &mut Solution,
    phase: EffectPhase,
    amount: Quantity,
    elapsed: Duration,
    ctx: &mut LifecycleContext<'_>,
) {
    let effects = definition.effects(phase);
    if effects.is_empty() {
        return;
    }
    let Some(rng) = ctx.rng.as_deref_mut() else {
        return;
    };
    let mut effect_ctx = EffectContext {
        key: ctx.key,
        solution,
        reaction: definition,
        phase,
        amount,
        elapsed,
    };
    run_effects(effects, &mut effect_ctx, rng, ctx.scope);
}
