//! Reusable reagents, reactions, and hooks.
//!
//! - [`registry`]: reagents `x`, `y`, `z`, `a`, `b`, catalyst `pt`, `water`.
//! - [`x_to_y`]: the canonical `X(2) -> Y(1)` instantaneous reaction.
//! - [`RecordingEffect`]: logs every transition it is run on.
//! - [`VetoListener`]: blocks chosen reactions and counts attempts.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alembic_core::{Quantity, Reagent, ReagentRegistry, Solution};
use alembic_reaction::{
    AttemptListener, EffectContext, EffectFlow, EffectPhase, ReactionAttempt, ReactionBuilder,
    ReactionDefinition, ReactionEffect,
};

/// Reagents used across the test suites. All have specific heat 1 except
/// `water` (4).
pub fn registry() -> ReagentRegistry {
    let mut registry: ReagentRegistry = ["x", "y", "z", "a", "b", "pt"]
        .into_iter()
        .map(Reagent::from)
        .collect();
    registry.insert(Reagent::new("water", 4.0));
    registry
}

/// `X(2) -> Y(1)`, instantaneous, no thermal window.
pub fn x_to_y() -> ReactionBuilder {
    ReactionDefinition::builder("x_to_y")
        .reactant("x", Quantity::new(2))
        .product("y", Quantity::new(1))
}

/// A one-to-one conversion `from -> to`.
pub fn convert(id: &str, from: &str, to: &str) -> ReactionBuilder {
    ReactionDefinition::builder(id)
        .reactant(from, Quantity::new(1))
        .product(to, Quantity::new(1))
}

/// Build with [`registry`], panicking on invalid fixtures.
pub fn build(builder: ReactionBuilder) -> ReactionDefinition {
    builder
        .build(&registry())
        .unwrap_or_else(|e| panic!("invalid fixture: {e}"))
}

/// A 100-unit solution holding `units` of each listed reagent.
pub fn solution_with(contents: &[(&str, i64)]) -> Solution {
    let registry = registry();
    let mut solution = Solution::new(Quantity::new(100));
    for (id, units) in contents {
        let reagent = registry
            .get(id)
            .cloned()
            .unwrap_or_else(|| Reagent::from(*id));
        solution.add_reagent(&reagent, Quantity::new(*units));
    }
    solution
}

// ── RecordingEffect ────────────────────────────────────────────────

/// One effect invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectEvent {
    pub phase: EffectPhase,
    pub amount: Quantity,
}

/// An effect that records each transition it runs on.
#[derive(Debug, Default)]
pub struct RecordingEffect {
    events: Mutex<Vec<EffectEvent>>,
}

impl RecordingEffect {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<EffectEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// How many times the effect ran on `phase`.
    pub fn count(&self, phase: EffectPhase) -> usize {
        self.events().iter().filter(|e| e.phase == phase).count()
    }
}

impl ReactionEffect for RecordingEffect {
    fn name(&self) -> &str {
        "recording"
    }

    fn apply(&self, ctx: &mut EffectContext<'_>) -> EffectFlow {
        if let Ok(mut events) = self.events.lock() {
            events.push(EffectEvent {
                phase: ctx.phase,
                amount: ctx.amount,
            });
        }
        EffectFlow::Continue
    }
}

/// Attach `effect` to all three transitions of `builder`.
pub fn record_all(builder: ReactionBuilder, effect: &Arc<RecordingEffect>) -> ReactionBuilder {
    builder
        .effect(EffectPhase::Start, effect.clone())
        .effect(EffectPhase::Step, effect.clone())
        .effect(EffectPhase::Stop, effect.clone())
}

// ── VetoListener ───────────────────────────────────────────────────

/// Blocks the listed reaction ids and counts every attempt it sees.
#[derive(Debug, Default)]
pub struct VetoListener {
    denied: Vec<String>,
    attempts: Arc<AtomicUsize>,
}

impl VetoListener {
    pub fn denying(ids: &[&str]) -> Self {
        Self {
            denied: ids.iter().map(|s| s.to_string()).collect(),
            attempts: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared attempt counter, readable after the listener is boxed.
    pub fn attempts(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl AttemptListener for VetoListener {
    fn permit(&self, attempt: &ReactionAttempt<'_>) -> bool {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        !self
            .denied
            .iter()
            .any(|id| id == attempt.reaction.id().as_str())
    }
}
