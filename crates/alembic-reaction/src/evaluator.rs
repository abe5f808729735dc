//! The reaction evaluator: how far may a reaction advance right now?
//!
//! [`can_react`] applies a fixed sequence of gates, each of which can
//! either narrow the permitted extent or block the reaction outright:
//!
//! 1. thermal window, plus the extent that would carry the solution to a
//!    window boundary;
//! 2. free volume, for reactions that may not overflow;
//! 3. [`AttemptListener`] vetoes;
//! 4. mixing, for new reactions or those needing continuous mixing;
//! 5. stoichiometry (catalysts gate presence only);
//! 6. rate and quantization.
//!
//! A [`Viability::Blocked`] result is structural (the lifecycle moves the
//! reaction to stopping). `Ready` with a zero extent is temporary
//! starvation, typically no elapsed time for a rate-limited reaction.

use std::time::Duration;

use alembic_core::{Quantity, ReagentId, Solution, SolutionKey};

use crate::definition::{ReactionDefinition, ReactionRate};
use crate::lifecycle::ReactionState;
use crate::mixing::MixingState;

/// Why a reaction cannot proceed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BlockReason {
    /// The solution's temperature is outside the reaction's window.
    OutsideThermalWindow,
    /// The solution already sits on the window boundary the reaction
    /// would push it across.
    ThermalLimit,
    /// No free volume for a reaction that may not overflow.
    NoRoom,
    /// An [`AttemptListener`] refused the attempt.
    Vetoed,
    /// Required mixing categories are not active.
    MixingRequired,
    /// A reactant or catalyst is absent (or short, for quantized reactions).
    MissingReactant(ReagentId),
    /// Not enough reactant for the smallest permitted step.
    Exhausted,
}

/// Result of [`can_react`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Viability {
    /// The reaction may advance by this extent (possibly zero).
    Ready(Quantity),
    /// The reaction cannot proceed and should terminate.
    Blocked(BlockReason),
}

impl Viability {
    /// The permitted extent, zero if blocked.
    pub fn amount(&self) -> Quantity {
        match self {
            Self::Ready(amount) => *amount,
            Self::Blocked(_) => Quantity::ZERO,
        }
    }

    /// Whether the reaction is blocked.
    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked(_))
    }
}

/// What an [`AttemptListener`] is asked about.
#[derive(Clone, Copy, Debug)]
pub struct ReactionAttempt<'a> {
    /// Where the reaction wants to occur.
    pub key: SolutionKey,
    /// The candidate reaction.
    pub reaction: &'a ReactionDefinition,
    /// The solution, before the step.
    pub solution: &'a Solution,
    /// Mixing active on the container.
    pub mixing: &'a MixingState,
}

/// An external hook that may forbid a reaction before it starts or steps.
pub trait AttemptListener: Send + Sync {
    /// Return `false` to block the attempt.
    fn permit(&self, attempt: &ReactionAttempt<'_>) -> bool;
}

/// Inputs to [`can_react`].
#[derive(Clone, Copy)]
pub struct Evaluation<'a> {
    /// Where the reaction wants to occur.
    pub key: SolutionKey,
    /// The candidate reaction.
    pub definition: &'a ReactionDefinition,
    /// The solution to evaluate against.
    pub solution: &'a Solution,
    /// The ongoing state, if the reaction is already active here.
    pub state: Option<&'a ReactionState>,
    /// Mixing active on the container.
    pub mixing: &'a MixingState,
    /// Current simulation time.
    pub now: Duration,
    /// Veto hooks, consulted in order.
    pub listeners: &'a [Box<dyn AttemptListener>],
}

/// Decide whether, and by how much, a reaction may advance.
pub fn can_react(eval: &Evaluation<'_>) -> Viability {
    let def = eval.definition;
    let solution = eval.solution;
    let mut amount = Quantity::MAX;

    // ── Thermal ────────────────────────────────────────────────
    if def.has_thermal_window() {
        let t0 = solution.temperature();
        if t0 < def.min_temperature() || t0 > def.max_temperature() {
            return Viability::Blocked(BlockReason::OutsideThermalWindow);
        }
        if let Some(limit) = thermal_limit(def, solution) {
            if limit < amount {
                amount = limit;
                if !amount.is_positive() {
                    return Viability::Blocked(BlockReason::ThermalLimit);
                }
            }
        }
    }

    // ── Volume ─────────────────────────────────────────────────
    let volume_delta = def.volume_delta();
    if !def.can_overflow() && volume_delta.is_positive() {
        let limit = solution.available_volume() / volume_delta;
        if limit < amount {
            amount = limit;
            if !amount.is_positive() {
                return Viability::Blocked(BlockReason::NoRoom);
            }
        }
    }

    // ── Veto ───────────────────────────────────────────────────
    let attempt = ReactionAttempt {
        key: eval.key,
        reaction: def,
        solution,
        mixing: eval.mixing,
    };
    if eval.listeners.iter().any(|l| !l.permit(&attempt)) {
        return Viability::Blocked(BlockReason::Vetoed);
    }

    // ── Mixing ─────────────────────────────────────────────────
    if let Some(requirement) = def.mixing() {
        let checked = eval.state.is_none() || requirement.continuous;
        if checked && !eval.mixing.covers(requirement) {
            return Viability::Blocked(BlockReason::MixingRequired);
        }
    }

    // ── Stoichiometry ──────────────────────────────────────────
    for reactant in def.reactants() {
        let present = solution.quantity(reactant.reagent.as_str());
        if reactant.catalyst {
            if present.is_zero() || (def.quantized() && present < reactant.coefficient) {
                return Viability::Blocked(BlockReason::MissingReactant(reactant.reagent.clone()));
            }
            continue;
        }
        if present.is_zero() {
            return Viability::Blocked(BlockReason::MissingReactant(reactant.reagent.clone()));
        }
        let extent = present / reactant.coefficient;
        if extent < amount {
            amount = extent;
        }
    }

    // A reaction only starts once a whole unit of it is available.
    if eval.state.is_none() && amount < Quantity::ONE {
        return Viability::Blocked(BlockReason::Exhausted);
    }

    // ── Rate and quantization ──────────────────────────────────
    match def.rate() {
        ReactionRate::Instant => {
            if def.quantized() {
                amount = amount.trunc();
            }
            if amount.is_positive() {
                Viability::Ready(amount)
            } else {
                Viability::Blocked(BlockReason::Exhausted)
            }
        }
        ReactionRate::PerSecond(rate) => {
            if !amount.is_positive() || (def.quantized() && amount < Quantity::ONE) {
                return Viability::Blocked(BlockReason::Exhausted);
            }
            let elapsed = eval
                .state
                .map(|s| eval.now.saturating_sub(s.last_update))
                .unwrap_or(Duration::ZERO);
            let rate_limit = Quantity::from_f64(f64::from(rate) * elapsed.as_secs_f64());
            Viability::Ready(amount.min(rate_limit))
        }
    }
}

/// The largest extent the solution supports right now, ignoring the rate:
/// the minimum of the reactant, free-volume and thermal-window limits.
///
/// A quantized reaction may have carried a fraction over from earlier
/// steps; the lifecycle caps its whole-unit transfer with this.
pub(crate) fn supported_extent(def: &ReactionDefinition, solution: &Solution) -> Quantity {
    let mut amount = Quantity::MAX;
    if def.has_thermal_window() {
        if let Some(limit) = thermal_limit(def, solution) {
            amount = amount.min(limit);
        }
    }
    let volume_delta = def.volume_delta();
    if !def.can_overflow() && volume_delta.is_positive() {
        amount = amount.min(solution.available_volume() / volume_delta);
    }
    for reactant in def.consumed() {
        amount = amount.min(solution.quantity(reactant.reagent.as_str()) / reactant.coefficient);
    }
    amount.max(Quantity::ZERO)
}

/// The largest extent that keeps the solution inside the thermal window,
/// or `None` if the reaction never reaches either boundary.
///
/// After `x` units the temperature is `T(x) = (T0·C0 + a·x) / (C0 + dC·x)`
/// where `a` is the energy the step brings in per unit at the current
/// temperature (see [`alembic_core::apply`] for the bookkeeping order).
/// Solving `T(x) = T` gives `x = (T·C0 − T0·C0) / (a − T·dC)`.
fn thermal_limit(def: &ReactionDefinition, solution: &Solution) -> Option<Quantity> {
    let c0 = solution.heat_capacity();
    if c0 <= 0.0 {
        return None;
    }
    let t0 = solution.temperature();
    let dc = def.heat_capacity_delta();
    let a = match def.product_temperature() {
        Some(tp) => tp * def.product_heat_capacity() - t0 * def.consumed_heat_capacity(),
        None => t0 * dc + def.heat_delta(),
    };
    // Sign of dT/dx at x = 0.
    let slope = a - t0 * dc;
    if slope == 0.0 {
        return None;
    }
    let boundary = if slope < 0.0 {
        def.min_temperature()
    } else {
        def.max_temperature()
    };
    if !boundary.is_finite() {
        return None;
    }
    let divisor = a - boundary * dc;
    if divisor == 0.0 {
        return None;
    }
    let x = (boundary * c0 - t0 * c0) / divisor;
    (x >= 0.0).then(|| Quantity::from_f32(x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mixing::MixingCategory;
    use alembic_core::{Reagent, ReagentRegistry};

    fn registry() -> ReagentRegistry {
        [
            Reagent::new("x", 1.0),
            Reagent::new("y", 1.0),
            Reagent::new("pt", 1.0),
        ]
        .into_iter()
        .collect()
    }

    fn x_to_y() -> crate::definition::ReactionBuilder {
        ReactionDefinition::builder("x_to_y")
            .reactant("x", Quantity::new(2))
            .product("y", Quantity::new(1))
    }

    fn solution(x: i64) -> Solution {
        Solution::new(Quantity::new(100)).with_reagent(&Reagent::from("x"), Quantity::new(x))
    }

    fn eval<'a>(
        def: &'a ReactionDefinition,
        solution: &'a Solution,
        mixing: &'a MixingState,
    ) -> Evaluation<'a> {
        Evaluation {
            key: SolutionKey::new(1u64, 0u32),
            definition: def,
            solution,
            state: None,
            mixing,
            now: Duration::from_secs(10),
            listeners: &[],
        }
    }

    fn running_since(secs: u64) -> ReactionState {
        ReactionState::new(Duration::from_secs(secs))
    }

    #[test]
    fn instant_reaction_limited_by_reactant() {
        let def = x_to_y().build(&registry()).unwrap();
        let s = solution(10);
        let mixing = MixingState::none();
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::new(5)));
    }

    #[test]
    fn new_reaction_needs_a_whole_unit() {
        let def = x_to_y().build(&registry()).unwrap();
        let s = solution(1);
        let mixing = MixingState::none();
        assert_eq!(
            can_react(&eval(&def, &s, &mixing)),
            Viability::Blocked(BlockReason::Exhausted)
        );
    }

    #[test]
    fn ongoing_reaction_may_drain_a_fraction() {
        let def = x_to_y().build(&registry()).unwrap();
        let s = solution(1);
        let mixing = MixingState::none();
        let state = running_since(0);
        let mut e = eval(&def, &s, &mixing);
        e.state = Some(&state);
        assert_eq!(can_react(&e), Viability::Ready(Quantity::from_raw(50)));
    }

    #[test]
    fn missing_reactant_blocks() {
        let def = x_to_y().build(&registry()).unwrap();
        let s = Solution::new(Quantity::new(100));
        let mixing = MixingState::none();
        assert!(matches!(
            can_react(&eval(&def, &s, &mixing)),
            Viability::Blocked(BlockReason::MissingReactant(r)) if r.as_str() == "x"
        ));
    }

    #[test]
    fn catalyst_gates_presence_but_not_extent() {
        let def = x_to_y()
            .catalyst("pt", Quantity::new(5))
            .build(&registry())
            .unwrap();
        let mixing = MixingState::none();

        let without = solution(10);
        assert!(can_react(&eval(&def, &without, &mixing)).is_blocked());

        let mut with = solution(10);
        with.add_reagent(&Reagent::from("pt"), Quantity::new(1));
        assert_eq!(can_react(&eval(&def, &with, &mixing)), Viability::Ready(Quantity::new(5)));
    }

    #[test]
    fn quantized_catalyst_needs_full_coefficient() {
        let def = x_to_y()
            .catalyst("pt", Quantity::new(5))
            .quantized(true)
            .build(&registry())
            .unwrap();
        let mut s = solution(10);
        s.add_reagent(&Reagent::from("pt"), Quantity::new(1));
        let mixing = MixingState::none();
        assert!(can_react(&eval(&def, &s, &mixing)).is_blocked());
    }

    #[test]
    fn quantized_instant_truncates() {
        let def = x_to_y().quantized(true).build(&registry()).unwrap();
        let s = solution(7);
        let mixing = MixingState::none();
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::new(3)));
    }

    #[test]
    fn outside_thermal_window_blocks() {
        let def = x_to_y().min_temperature(400.0).build(&registry()).unwrap();
        let s = solution(10);
        let mixing = MixingState::none();
        assert_eq!(
            can_react(&eval(&def, &s, &mixing)),
            Viability::Blocked(BlockReason::OutsideThermalWindow)
        );
    }

    #[test]
    fn heat_release_is_capped_at_the_window_edge() {
        // 100u x (C = 100) at 300 K; each unit of x -> y (1:1, same specific
        // heat) releases 100 J, i.e. +1 K per unit. Max 310 K -> 10 units.
        let reg = registry();
        let def = ReactionDefinition::builder("hot")
            .reactant("x", Quantity::new(1))
            .product("y", Quantity::new(1))
            .max_temperature(310.0)
            .heat_delta(100.0)
            .build(&reg)
            .unwrap();
        let s = Solution::new(Quantity::new(1000))
            .with_temperature(300.0)
            .with_reagent(&Reagent::from("x"), Quantity::new(100));
        let mixing = MixingState::none();
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::new(10)));
    }

    #[test]
    fn at_the_boundary_a_reaction_moving_away_is_not_limited() {
        let reg = registry();
        let def = ReactionDefinition::builder("cold")
            .reactant("x", Quantity::new(1))
            .product("y", Quantity::new(1))
            .max_temperature(300.0)
            .heat_delta(-100.0)
            .build(&reg)
            .unwrap();
        let s = Solution::new(Quantity::new(1000))
            .with_temperature(300.0)
            .with_reagent(&Reagent::from("x"), Quantity::new(10));
        let mixing = MixingState::none();
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::new(10)));
    }

    #[test]
    fn no_overflow_caps_by_free_volume() {
        let def = ReactionDefinition::builder("foam")
            .reactant("x", Quantity::new(1))
            .product("y", Quantity::new(3))
            .can_overflow(false)
            .build(&registry())
            .unwrap();
        let s = Solution::new(Quantity::new(20)).with_reagent(&Reagent::from("x"), Quantity::new(10));
        let mixing = MixingState::none();
        // 10u free, +2u per unit of reaction
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::new(5)));

        let full = Solution::new(Quantity::new(10)).with_reagent(&Reagent::from("x"), Quantity::new(10));
        assert_eq!(
            can_react(&eval(&def, &full, &mixing)),
            Viability::Blocked(BlockReason::NoRoom)
        );
    }

    struct Deny;

    impl AttemptListener for Deny {
        fn permit(&self, attempt: &ReactionAttempt<'_>) -> bool {
            attempt.reaction.id().as_str() != "x_to_y"
        }
    }

    #[test]
    fn listener_can_veto() {
        let def = x_to_y().build(&registry()).unwrap();
        let s = solution(10);
        let mixing = MixingState::none();
        let listeners: Vec<Box<dyn AttemptListener>> = vec![Box::new(Deny)];
        let mut e = eval(&def, &s, &mixing);
        e.listeners = &listeners;
        assert_eq!(can_react(&e), Viability::Blocked(BlockReason::Vetoed));
    }

    #[test]
    fn mixing_checked_at_start_only_unless_continuous() {
        let def = x_to_y().mixing(["stir"], false).build(&registry()).unwrap();
        let s = solution(10);
        let idle = MixingState::none();
        assert_eq!(
            can_react(&eval(&def, &s, &idle)),
            Viability::Blocked(BlockReason::MixingRequired)
        );

        let state = running_since(0);
        let mut e = eval(&def, &s, &idle);
        e.state = Some(&state);
        assert!(!can_react(&e).is_blocked());

        let stirring: MixingState = [MixingCategory::new("stir")].into_iter().collect();
        assert!(!can_react(&eval(&def, &s, &stirring)).is_blocked());

        let continuous = x_to_y().mixing(["stir"], true).build(&registry()).unwrap();
        let mut e = eval(&continuous, &s, &idle);
        e.state = Some(&state);
        assert_eq!(can_react(&e), Viability::Blocked(BlockReason::MixingRequired));
    }

    #[test]
    fn finite_rate_scales_with_elapsed_time() {
        let def = x_to_y().rate(0.5).build(&registry()).unwrap();
        let s = solution(100);
        let mixing = MixingState::none();

        // New reactions have no elapsed time.
        assert_eq!(can_react(&eval(&def, &s, &mixing)), Viability::Ready(Quantity::ZERO));

        let state = running_since(6);
        let mut e = eval(&def, &s, &mixing);
        e.state = Some(&state);
        // 4 s at 0.5/s
        assert_eq!(can_react(&e), Viability::Ready(Quantity::new(2)));
    }

    #[test]
    fn quantized_finite_rate_blocks_below_one_unit_of_reactant() {
        let def = x_to_y().rate(1.0).quantized(true).build(&registry()).unwrap();
        let s = solution(1);
        let mixing = MixingState::none();
        let state = running_since(0);
        let mut e = eval(&def, &s, &mixing);
        e.state = Some(&state);
        assert_eq!(can_react(&e), Viability::Blocked(BlockReason::Exhausted));
    }

    mod properties {
        use super::*;
        use alembic_core::{apply, ProducedReagent, ReagentId};
        use proptest::prelude::*;

        fn solution_raw(raw: i64) -> Solution {
            Solution::new(Quantity::new(1_000))
                .with_reagent(&Reagent::from("x"), Quantity::from_raw(raw))
        }

        proptest! {
            #[test]
            fn ready_amount_never_overdraws(raw in 0i64..100_000, quantized in any::<bool>()) {
                let def = x_to_y().quantized(quantized).build(&registry()).unwrap();
                let s = solution_raw(raw);
                let mixing = MixingState::none();
                if let Viability::Ready(amount) = can_react(&eval(&def, &s, &mixing)) {
                    prop_assert!(amount * Quantity::new(2) <= s.quantity("x"));
                    prop_assert!(amount >= Quantity::ONE);
                    if quantized {
                        prop_assert!(amount.is_whole());
                    }
                }
            }

            #[test]
            fn thermal_limit_keeps_temperature_in_window(
                raw in 100i64..50_000,
                heat in 1.0f32..500.0,
            ) {
                let def = x_to_y()
                    .max_temperature(350.0)
                    .heat_delta(heat)
                    .build(&registry())
                    .unwrap();
                let mut s = solution_raw(raw);
                let mixing = MixingState::none();
                let viability = can_react(&eval(&def, &s, &mixing));
                if let Viability::Ready(amount) = viability {
                    apply(
                        &mut s,
                        &[(ReagentId::new("x"), amount * Quantity::new(2))],
                        &[ProducedReagent {
                            reagent: ReagentId::new("y"),
                            quantity: amount,
                            specific_heat: 1.0,
                        }],
                        None,
                        heat * amount.to_f32(),
                    );
                    prop_assert!(s.temperature() <= 350.5, "{}", s.temperature());
                }
            }
        }
    }
}
