//! Start/step/stop effect hooks.
//!
//! Effects are registered per reaction definition and run by the lifecycle
//! state machine on each transition: start effects when a reaction first
//! becomes viable, step effects after every mass transfer, and stop effects
//! when it terminates or is cancelled by a definition reload.
//!
//! Custom behaviour implements [`ReactionEffect`]; the serde-loadable
//! [`BuiltinEffect`] covers the common cases for configuration files.

use std::fmt;
use std::time::Duration;

use alembic_core::{Quantity, ReagentId, Solution, SolutionKey};
use rand_chacha::rand_core::RngCore;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::definition::ReactionDefinition;

/// Which lifecycle transition an effect runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectPhase {
    /// The reaction became viable in a solution.
    Start,
    /// The reaction transferred mass.
    Step,
    /// The reaction terminated or was cancelled.
    Stop,
}

impl fmt::Display for EffectPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Step => write!(f, "step"),
            Self::Stop => write!(f, "stop"),
        }
    }
}

/// Severity of an administratively logged effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogImpact {
    /// Routine.
    Low,
    /// Worth a look.
    Medium,
    /// Likely player-visible harm.
    High,
    /// Station-wide consequences.
    Extreme,
}

impl fmt::Display for LogImpact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Extreme => write!(f, "extreme"),
        }
    }
}

/// Whether the remaining effects of the current transition should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectFlow {
    /// Run the next effect.
    Continue,
    /// Skip the rest of this transition's effects.
    Halt,
}

/// Which of a transition's effects run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EffectScope {
    /// Every effect.
    #[default]
    All,
    /// Only effects reporting [`ReactionEffect::solution_only`]. Predictive
    /// runs use this to follow the solution without outside side effects.
    SolutionOnly,
}

/// Everything an effect can see and touch.
pub struct EffectContext<'a> {
    /// The solution the reaction runs in.
    pub key: SolutionKey,
    /// Mutable access to that solution.
    pub solution: &'a mut Solution,
    /// The reaction whose transition triggered the effect.
    pub reaction: &'a ReactionDefinition,
    /// The transition being processed.
    pub phase: EffectPhase,
    /// Step extent for step effects, cumulative extent for stop effects,
    /// zero for start effects.
    pub amount: Quantity,
    /// Time since the previous step (step effects) or since the reaction
    /// started (stop effects).
    pub elapsed: Duration,
}

impl EffectContext<'_> {
    /// Emit an administrative log entry attributed to this reaction.
    pub fn admin_log(&self, impact: LogImpact, message: &str) {
        info!(
            target: "alembic::admin",
            reaction = %self.reaction.id(),
            solution = %self.key,
            phase = %self.phase,
            %impact,
            "{message}"
        );
    }
}

/// A side effect attached to a reaction transition.
///
/// Effects may read or mutate the solution. They must be deterministic
/// given the context; randomness is limited to [`probability`], which the
/// engine rolls from its seeded RNG.
///
/// [`probability`]: ReactionEffect::probability
pub trait ReactionEffect: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Chance in `[0, 1]` that the effect fires on a given transition.
    fn probability(&self) -> f32 {
        1.0
    }

    /// If set, every application is logged on the `alembic::admin` target.
    fn log_impact(&self) -> Option<LogImpact> {
        None
    }

    /// Run the effect.
    fn apply(&self, ctx: &mut EffectContext<'_>) -> EffectFlow;

    /// Whether the effect changes nothing but the solution. Predictive runs
    /// apply these and skip the rest.
    fn solution_only(&self) -> bool {
        false
    }

    /// The configuration form of this effect, if it has one. Reloads use
    /// it to compare effects by value instead of by identity.
    fn as_builtin(&self) -> Option<&BuiltinEffect> {
        None
    }
}

impl fmt::Debug for dyn ReactionEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionEffect")
            .field("name", &self.name())
            .finish()
    }
}

/// Run a transition's effects in order.
///
/// Effects whose probability roll fails are skipped; an effect returning
/// [`EffectFlow::Halt`] ends the list. Effects outside `scope` are skipped
/// after their roll, so the RNG advances the same way for every scope.
pub fn run_effects(
    effects: &[Arc<dyn ReactionEffect>],
    ctx: &mut EffectContext<'_>,
    rng: &mut ChaCha8Rng,
    scope: EffectScope,
) {
    for effect in effects {
        let p = effect.probability();
        if p < 1.0 && unit_interval(rng) >= p {
            continue;
        }
        if scope == EffectScope::SolutionOnly && !effect.solution_only() {
            continue;
        }

        if let Some(impact) = effect.log_impact() {
            info!(
                target: "alembic::admin",
                effect = effect.name(),
                reaction = %ctx.reaction.id(),
                solution = %ctx.key,
                phase = %ctx.phase,
                %impact,
                "reaction effect applied"
            );
        }

        if effect.apply(ctx) == EffectFlow::Halt {
            break;
        }
    }
}

/// Uniform sample in `[0, 1)` with 24 bits of precision.
fn unit_interval(rng: &mut ChaCha8Rng) -> f32 {
    (rng.next_u32() >> 8) as f32 / (1u32 << 24) as f32
}

// ── Built-in effects ───────────────────────────────────────────────

/// What a [`BuiltinEffect`] does.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EffectKind {
    /// Add (positive) or remove (negative) a reagent.
    AdjustReagent {
        /// The reagent to adjust.
        reagent: ReagentId,
        /// Quantity to add or remove.
        amount: Quantity,
        /// Specific heat of the reagent if it is not already present.
        #[serde(default = "default_specific_heat")]
        specific_heat: f32,
        /// Multiply `amount` by the transition's reaction extent.
        #[serde(default)]
        scaled: bool,
    },
    /// Add thermal energy (negative to cool).
    AdjustThermalEnergy {
        /// Joules to add.
        joules: f32,
        /// Multiply `joules` by the transition's reaction extent.
        #[serde(default)]
        scaled: bool,
    },
    /// Force the solution temperature.
    SetTemperature {
        /// Target temperature.
        kelvin: f32,
    },
    /// Write an administrative log entry.
    AdminLog {
        /// Message to record.
        message: String,
    },
}

fn default_specific_heat() -> f32 {
    1.0
}

fn default_probability() -> f32 {
    1.0
}

/// A configuration-loadable effect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BuiltinEffect {
    /// What the effect does.
    #[serde(flatten)]
    pub kind: EffectKind,
    /// Chance the effect fires.
    #[serde(default = "default_probability")]
    pub probability: f32,
    /// Admin-log severity, if the effect should be logged.
    #[serde(default)]
    pub log_impact: Option<LogImpact>,
}

impl BuiltinEffect {
    /// An always-firing, unlogged effect.
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            probability: 1.0,
            log_impact: None,
        }
    }
}

impl ReactionEffect for BuiltinEffect {
    fn name(&self) -> &str {
        match self.kind {
            EffectKind::AdjustReagent { .. } => "adjust_reagent",
            EffectKind::AdjustThermalEnergy { .. } => "adjust_thermal_energy",
            EffectKind::SetTemperature { .. } => "set_temperature",
            EffectKind::AdminLog { .. } => "admin_log",
        }
    }

    fn probability(&self) -> f32 {
        self.probability
    }

    fn log_impact(&self) -> Option<LogImpact> {
        self.log_impact
    }

    fn solution_only(&self) -> bool {
        self.log_impact.is_none() && !matches!(self.kind, EffectKind::AdminLog { .. })
    }

    fn as_builtin(&self) -> Option<&BuiltinEffect> {
        Some(self)
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> EffectFlow {
        match &self.kind {
            EffectKind::AdjustReagent {
                reagent,
                amount,
                specific_heat,
                scaled,
            } => {
                let amount = if *scaled { *amount * ctx.amount } else { *amount };
                if amount.is_positive() {
                    let room = ctx.solution.available_volume();
                    ctx.solution
                        .insert(reagent, *specific_heat, amount.min(room), None);
                } else if amount < Quantity::ZERO {
                    ctx.solution
                        .remove_reagent(reagent.as_str(), Quantity::ZERO - amount);
                }
            }
            EffectKind::AdjustThermalEnergy { joules, scaled } => {
                let joules = if *scaled {
                    joules * ctx.amount.to_f32()
                } else {
                    *joules
                };
                ctx.solution.add_thermal_energy(joules);
            }
            EffectKind::SetTemperature { kelvin } => ctx.solution.set_temperature(*kelvin),
            EffectKind::AdminLog { message } => {
                ctx.admin_log(self.log_impact.unwrap_or(LogImpact::Low), message);
            }
        }
        EffectFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ReactionDefinition;
    use alembic_core::{Reagent, ReagentRegistry};
    use rand_chacha::rand_core::SeedableRng;

    fn registry() -> ReagentRegistry {
        [Reagent::new("x", 1.0), Reagent::new("y", 1.0)]
            .into_iter()
            .collect()
    }

    fn reaction() -> ReactionDefinition {
        ReactionDefinition::builder("x_to_y")
            .reactant("x", Quantity::new(1))
            .product("y", Quantity::new(1))
            .build(&registry())
            .unwrap()
    }

    fn ctx<'a>(
        solution: &'a mut Solution,
        reaction: &'a ReactionDefinition,
        amount: Quantity,
    ) -> EffectContext<'a> {
        EffectContext {
            key: SolutionKey::new(1u64, 0u32),
            solution,
            reaction,
            phase: EffectPhase::Step,
            amount,
            elapsed: Duration::ZERO,
        }
    }

    struct Halting;

    impl ReactionEffect for Halting {
        fn name(&self) -> &str {
            "halting"
        }

        fn apply(&self, _ctx: &mut EffectContext<'_>) -> EffectFlow {
            EffectFlow::Halt
        }
    }

    #[test]
    fn adjust_reagent_scaled_by_extent() {
        let reaction = reaction();
        let mut solution = Solution::new(Quantity::new(100));
        let effect = BuiltinEffect::new(EffectKind::AdjustReagent {
            reagent: ReagentId::new("smoke"),
            amount: Quantity::new(2),
            specific_heat: 1.0,
            scaled: true,
        });
        effect.apply(&mut ctx(&mut solution, &reaction, Quantity::new(3)));
        assert_eq!(solution.quantity("smoke"), Quantity::new(6));
    }

    #[test]
    fn adjust_reagent_keeps_stored_specific_heat() {
        let reaction = reaction();
        let mut solution = Solution::new(Quantity::new(100))
            .with_reagent(&Reagent::new("water", 4.0), Quantity::new(10));
        let effect = BuiltinEffect::new(EffectKind::AdjustReagent {
            reagent: ReagentId::new("water"),
            amount: Quantity::new(5),
            specific_heat: 1.0,
            scaled: false,
        });
        effect.apply(&mut ctx(&mut solution, &reaction, Quantity::ZERO));
        assert_eq!(solution.quantity("water"), Quantity::new(15));
        assert!((solution.heat_capacity() - 60.0).abs() < 1e-3);
    }

    #[test]
    fn negative_adjust_removes() {
        let reaction = reaction();
        let mut solution =
            Solution::new(Quantity::new(100)).with_reagent(&Reagent::from("y"), Quantity::new(5));
        let effect = BuiltinEffect::new(EffectKind::AdjustReagent {
            reagent: ReagentId::new("y"),
            amount: Quantity::new(-2),
            specific_heat: 1.0,
            scaled: false,
        });
        effect.apply(&mut ctx(&mut solution, &reaction, Quantity::ZERO));
        assert_eq!(solution.quantity("y"), Quantity::new(3));
    }

    #[test]
    fn halt_skips_remaining_effects() {
        let reaction = reaction();
        let mut solution = Solution::new(Quantity::new(100));
        let effects: Vec<Arc<dyn ReactionEffect>> = vec![
            Arc::new(Halting),
            Arc::new(BuiltinEffect::new(EffectKind::SetTemperature { kelvin: 500.0 })),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = ctx(&mut solution, &reaction, Quantity::ZERO);
        run_effects(&effects, &mut ctx, &mut rng, EffectScope::All);
        assert_eq!(solution.temperature(), alembic_core::T20C);
    }

    #[test]
    fn solution_only_scope_skips_effects_with_outside_reach() {
        let reaction = reaction();
        let mut solution = Solution::new(Quantity::new(100));
        let mut logged = BuiltinEffect::new(EffectKind::SetTemperature { kelvin: 400.0 });
        logged.log_impact = Some(LogImpact::High);
        let effects: Vec<Arc<dyn ReactionEffect>> = vec![
            Arc::new(Halting),
            Arc::new(BuiltinEffect::new(EffectKind::SetTemperature { kelvin: 500.0 })),
            Arc::new(logged),
        ];
        assert!(!effects[0].solution_only());
        assert!(effects[1].solution_only());
        assert!(!effects[2].solution_only());

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let mut ctx = ctx(&mut solution, &reaction, Quantity::ZERO);
        run_effects(&effects, &mut ctx, &mut rng, EffectScope::SolutionOnly);
        assert_eq!(solution.temperature(), 500.0);
    }

    #[test]
    fn zero_probability_never_fires() {
        let reaction = reaction();
        let mut solution = Solution::new(Quantity::new(100));
        let mut effect = BuiltinEffect::new(EffectKind::SetTemperature { kelvin: 500.0 });
        effect.probability = 0.0;
        let effects: Vec<Arc<dyn ReactionEffect>> = vec![Arc::new(effect)];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..32 {
            let mut ctx = ctx(&mut solution, &reaction, Quantity::ZERO);
            run_effects(&effects, &mut ctx, &mut rng, EffectScope::All);
        }
        assert_eq!(solution.temperature(), alembic_core::T20C);
    }

    #[test]
    fn builtin_effect_deserializes_from_tagged_json() {
        let json = r#"{ "type": "adjust_thermal_energy", "joules": -50.0, "probability": 0.5 }"#;
        let effect: BuiltinEffect = serde_json::from_str(json).unwrap();
        assert_eq!(
            effect.kind,
            EffectKind::AdjustThermalEnergy {
                joules: -50.0,
                scaled: false
            }
        );
        assert_eq!(effect.probability, 0.5);
        assert_eq!(effect.log_impact, None);
    }
}
