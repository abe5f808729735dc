//! Immutable reaction definitions.
//!
//! A [`ReactionDefinition`] is built once from configuration via
//! [`ReactionBuilder`], which validates it against the reagent registry and
//! derives the properties the hot path needs (heat-capacity delta, volume
//! delta, per-product specific heats). Definitions are shared as
//! `Arc<ReactionDefinition>` and only replaced wholesale on reload.

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use alembic_core::{Quantity, ReactionId, ReagentId, ReagentRegistry};
use smallvec::SmallVec;

use crate::effect::{EffectPhase, ReactionEffect};
use crate::error::DefinitionError;
use crate::mixing::{MixingCategory, MixingRequirement};

/// A required input of a reaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Reactant {
    /// The reagent consumed (or, for a catalyst, merely required).
    pub reagent: ReagentId,
    /// Units needed per unit of reaction.
    pub coefficient: Quantity,
    /// Catalysts must be present but are never consumed.
    pub catalyst: bool,
    /// Heat capacity per unit, copied from the registry.
    pub specific_heat: f32,
}

/// An output of a reaction.
#[derive(Clone, Debug, PartialEq)]
pub struct Product {
    /// The reagent produced.
    pub reagent: ReagentId,
    /// Units produced per unit of reaction.
    pub coefficient: Quantity,
    /// Heat capacity per unit, copied from the registry.
    pub specific_heat: f32,
}

/// How fast a reaction proceeds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ReactionRate {
    /// Completes fully within a single update, even with zero elapsed time.
    Instant,
    /// Units of reaction per second.
    PerSecond(f32),
}

impl ReactionRate {
    /// Whether the rate is [`ReactionRate::Instant`].
    pub fn is_instant(self) -> bool {
        matches!(self, Self::Instant)
    }
}

/// Ordering key for candidate reactions: higher priority first, then id.
pub type ReactionOrder = (Reverse<i32>, ReactionId);

/// A static description of a transformation between reagents.
#[derive(Clone)]
pub struct ReactionDefinition {
    id: ReactionId,
    priority: i32,
    reactants: SmallVec<[Reactant; 4]>,
    products: SmallVec<[Product; 4]>,
    min_temperature: f32,
    max_temperature: f32,
    heat_delta: f32,
    product_temperature: Option<f32>,
    rate: ReactionRate,
    quantized: bool,
    can_overflow: bool,
    mixing: Option<MixingRequirement>,
    start_effects: Vec<Arc<dyn ReactionEffect>>,
    step_effects: Vec<Arc<dyn ReactionEffect>>,
    stop_effects: Vec<Arc<dyn ReactionEffect>>,
    // Derived at build time.
    consumed_heat_capacity: f32,
    product_heat_capacity: f32,
    volume_delta: Quantity,
}

impl ReactionDefinition {
    /// Start building a definition with the given id.
    pub fn builder(id: impl Into<ReactionId>) -> ReactionBuilder {
        ReactionBuilder::new(id.into())
    }

    /// Unique id.
    pub fn id(&self) -> &ReactionId {
        &self.id
    }

    /// Higher priorities are evaluated first within a pass.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Deterministic evaluation order key.
    pub fn order(&self) -> ReactionOrder {
        (Reverse(self.priority), self.id.clone())
    }

    /// All reactants, catalysts included, in declaration order.
    pub fn reactants(&self) -> &[Reactant] {
        &self.reactants
    }

    /// Reactants that are actually consumed.
    pub fn consumed(&self) -> impl Iterator<Item = &Reactant> {
        self.reactants.iter().filter(|r| !r.catalyst)
    }

    /// Reactants that are required but not consumed.
    pub fn catalysts(&self) -> impl Iterator<Item = &Reactant> {
        self.reactants.iter().filter(|r| r.catalyst)
    }

    /// Products in declaration order.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// The reagent this definition is indexed under: the first
    /// non-catalyst reactant, or the first reactant if all are catalysts.
    pub fn index_reagent(&self) -> Option<&ReagentId> {
        self.consumed()
            .next()
            .or_else(|| self.reactants.first())
            .map(|r| &r.reagent)
    }

    /// Lower bound of the thermal window (may be `-inf`).
    pub fn min_temperature(&self) -> f32 {
        self.min_temperature
    }

    /// Upper bound of the thermal window (may be `+inf`).
    pub fn max_temperature(&self) -> f32 {
        self.max_temperature
    }

    /// Whether either thermal bound is finite.
    pub fn has_thermal_window(&self) -> bool {
        self.min_temperature > f32::NEG_INFINITY || self.max_temperature < f32::INFINITY
    }

    /// Thermal energy released per unit of reaction (negative absorbs).
    pub fn heat_delta(&self) -> f32 {
        self.heat_delta
    }

    /// Change in the solution's heat capacity per unit of reaction.
    pub fn heat_capacity_delta(&self) -> f32 {
        self.product_heat_capacity - self.consumed_heat_capacity
    }

    /// Heat capacity removed per unit of reaction.
    pub fn consumed_heat_capacity(&self) -> f32 {
        self.consumed_heat_capacity
    }

    /// Heat capacity added per unit of reaction.
    pub fn product_heat_capacity(&self) -> f32 {
        self.product_heat_capacity
    }

    /// Net change in volume per unit of reaction.
    pub fn volume_delta(&self) -> Quantity {
        self.volume_delta
    }

    /// Temperature products enter at, if fixed. Only meaningful when the
    /// reaction has products.
    pub fn product_temperature(&self) -> Option<f32> {
        if self.products.is_empty() {
            None
        } else {
            self.product_temperature
        }
    }

    /// Rate of progress.
    pub fn rate(&self) -> ReactionRate {
        self.rate
    }

    /// Whether the reaction only proceeds in whole units.
    pub fn quantized(&self) -> bool {
        self.quantized
    }

    /// Whether the reaction may produce more than the solution can hold.
    pub fn can_overflow(&self) -> bool {
        self.can_overflow
    }

    /// Mixing needed to proceed, if any.
    pub fn mixing(&self) -> Option<&MixingRequirement> {
        self.mixing.as_ref()
    }

    /// Effects for a transition.
    pub fn effects(&self, phase: EffectPhase) -> &[Arc<dyn ReactionEffect>] {
        match phase {
            EffectPhase::Start => &self.start_effects,
            EffectPhase::Step => &self.step_effects,
            EffectPhase::Stop => &self.stop_effects,
        }
    }

    /// Check structural invariants.
    ///
    /// The builder runs this before returning a definition; the catalog
    /// runs it again at index time.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let reaction = || self.id.clone();
        if self.reactants.is_empty() {
            return Err(DefinitionError::EmptyReactants {
                reaction: reaction(),
            });
        }
        for (i, r) in self.reactants.iter().enumerate() {
            if !r.coefficient.is_positive() {
                return Err(DefinitionError::NonPositiveCoefficient {
                    reaction: reaction(),
                    reagent: r.reagent.clone(),
                });
            }
            if self.reactants[..i].iter().any(|o| o.reagent == r.reagent) {
                return Err(DefinitionError::DuplicateReactant {
                    reaction: reaction(),
                    reagent: r.reagent.clone(),
                });
            }
        }
        for p in &self.products {
            if !p.coefficient.is_positive() {
                return Err(DefinitionError::NonPositiveCoefficient {
                    reaction: reaction(),
                    reagent: p.reagent.clone(),
                });
            }
        }
        if self.min_temperature.is_nan()
            || self.max_temperature.is_nan()
            || self.min_temperature > self.max_temperature
        {
            return Err(DefinitionError::InvalidTemperatureWindow {
                reaction: reaction(),
                min: self.min_temperature,
                max: self.max_temperature,
            });
        }
        if let ReactionRate::PerSecond(value) = self.rate {
            if !(value > 0.0) || value.is_infinite() {
                return Err(DefinitionError::InvalidRate {
                    reaction: reaction(),
                    value,
                });
            }
        }
        if !self.heat_delta.is_finite() {
            return Err(DefinitionError::InvalidThermalProperty {
                reaction: reaction(),
                property: "heat_delta",
                value: self.heat_delta,
            });
        }
        if let Some(t) = self.product_temperature {
            if !t.is_finite() || t < 0.0 {
                return Err(DefinitionError::InvalidThermalProperty {
                    reaction: reaction(),
                    property: "product_temperature",
                    value: t,
                });
            }
        }
        Ok(())
    }
}

fn same_effects(a: &[Arc<dyn ReactionEffect>], b: &[Arc<dyn ReactionEffect>]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            Arc::ptr_eq(x, y)
                || matches!((x.as_builtin(), y.as_builtin()), (Some(p), Some(q)) if p == q)
        })
}

/// Data fields compare by value. Built-in effects compare by value, other
/// effects by identity.
impl PartialEq for ReactionDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.priority == other.priority
            && self.reactants == other.reactants
            && self.products == other.products
            && self.min_temperature == other.min_temperature
            && self.max_temperature == other.max_temperature
            && self.heat_delta == other.heat_delta
            && self.product_temperature == other.product_temperature
            && self.rate == other.rate
            && self.quantized == other.quantized
            && self.can_overflow == other.can_overflow
            && self.mixing == other.mixing
            && same_effects(&self.start_effects, &other.start_effects)
            && same_effects(&self.step_effects, &other.step_effects)
            && same_effects(&self.stop_effects, &other.stop_effects)
    }
}

impl fmt::Debug for ReactionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactionDefinition")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("reactants", &self.reactants)
            .field("products", &self.products)
            .field("min_temperature", &self.min_temperature)
            .field("max_temperature", &self.max_temperature)
            .field("heat_delta", &self.heat_delta)
            .field("rate", &self.rate)
            .field("quantized", &self.quantized)
            .field("can_overflow", &self.can_overflow)
            .field("mixing", &self.mixing)
            .finish_non_exhaustive()
    }
}

// ── Builder ────────────────────────────────────────────────────────

/// Builder for [`ReactionDefinition`].
///
/// Defaults: no thermal window, instantaneous, not quantized, may
/// overflow, priority 0, no mixing requirement, no effects.
pub struct ReactionBuilder {
    id: ReactionId,
    priority: i32,
    reactants: Vec<(ReagentId, Quantity, bool)>,
    products: Vec<(ReagentId, Quantity)>,
    min_temperature: f32,
    max_temperature: f32,
    heat_delta: f32,
    product_temperature: Option<f32>,
    rate: ReactionRate,
    quantized: bool,
    can_overflow: bool,
    mixing: Option<MixingRequirement>,
    start_effects: Vec<Arc<dyn ReactionEffect>>,
    step_effects: Vec<Arc<dyn ReactionEffect>>,
    stop_effects: Vec<Arc<dyn ReactionEffect>>,
}

impl ReactionBuilder {
    fn new(id: ReactionId) -> Self {
        Self {
            id,
            priority: 0,
            reactants: Vec::new(),
            products: Vec::new(),
            min_temperature: f32::NEG_INFINITY,
            max_temperature: f32::INFINITY,
            heat_delta: 0.0,
            product_temperature: None,
            rate: ReactionRate::Instant,
            quantized: false,
            can_overflow: true,
            mixing: None,
            start_effects: Vec::new(),
            step_effects: Vec::new(),
            stop_effects: Vec::new(),
        }
    }

    /// Add a consumed reactant.
    pub fn reactant(mut self, reagent: impl Into<ReagentId>, coefficient: Quantity) -> Self {
        self.reactants.push((reagent.into(), coefficient, false));
        self
    }

    /// Add a catalyst (required, not consumed).
    pub fn catalyst(mut self, reagent: impl Into<ReagentId>, coefficient: Quantity) -> Self {
        self.reactants.push((reagent.into(), coefficient, true));
        self
    }

    /// Add a product.
    pub fn product(mut self, reagent: impl Into<ReagentId>, coefficient: Quantity) -> Self {
        self.products.push((reagent.into(), coefficient));
        self
    }

    /// Set the evaluation priority (default 0).
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Lower bound of the thermal window.
    pub fn min_temperature(mut self, kelvin: f32) -> Self {
        self.min_temperature = kelvin;
        self
    }

    /// Upper bound of the thermal window.
    pub fn max_temperature(mut self, kelvin: f32) -> Self {
        self.max_temperature = kelvin;
        self
    }

    /// Thermal energy released per unit of reaction.
    pub fn heat_delta(mut self, joules: f32) -> Self {
        self.heat_delta = joules;
        self
    }

    /// Fixed temperature products enter at.
    pub fn product_temperature(mut self, kelvin: f32) -> Self {
        self.product_temperature = Some(kelvin);
        self
    }

    /// Units of reaction per second. `f32::INFINITY` means instantaneous.
    pub fn rate(mut self, per_second: f32) -> Self {
        self.rate = if per_second == f32::INFINITY {
            ReactionRate::Instant
        } else {
            ReactionRate::PerSecond(per_second)
        };
        self
    }

    /// Proceed only in whole units.
    pub fn quantized(mut self, quantized: bool) -> Self {
        self.quantized = quantized;
        self
    }

    /// Allow producing more volume than the solution can hold.
    pub fn can_overflow(mut self, can_overflow: bool) -> Self {
        self.can_overflow = can_overflow;
        self
    }

    /// Require mixing categories. With `continuous` they are checked on
    /// every step rather than only at start.
    pub fn mixing<C: Into<MixingCategory>>(
        mut self,
        categories: impl IntoIterator<Item = C>,
        continuous: bool,
    ) -> Self {
        self.mixing = Some(MixingRequirement {
            categories: categories.into_iter().map(Into::into).collect(),
            continuous,
        });
        self
    }

    /// Attach an effect to a transition.
    pub fn effect(mut self, phase: EffectPhase, effect: Arc<dyn ReactionEffect>) -> Self {
        match phase {
            EffectPhase::Start => self.start_effects.push(effect),
            EffectPhase::Step => self.step_effects.push(effect),
            EffectPhase::Stop => self.stop_effects.push(effect),
        }
        self
    }

    /// Validate and derive properties.
    ///
    /// # Errors
    ///
    /// Returns [`DefinitionError`] if a reagent is unregistered or any
    /// structural invariant fails (see [`ReactionDefinition::validate`]).
    pub fn build(self, registry: &ReagentRegistry) -> Result<ReactionDefinition, DefinitionError> {
        let specific_heat = |reagent: &ReagentId| {
            registry
                .specific_heat(reagent.as_str())
                .ok_or_else(|| DefinitionError::UnknownReagent {
                    reaction: self.id.clone(),
                    reagent: reagent.clone(),
                })
        };

        let mut reactants: SmallVec<[Reactant; 4]> = SmallVec::with_capacity(self.reactants.len());
        for (reagent, coefficient, catalyst) in &self.reactants {
            reactants.push(Reactant {
                specific_heat: specific_heat(reagent)?,
                reagent: reagent.clone(),
                coefficient: *coefficient,
                catalyst: *catalyst,
            });
        }
        let mut products: SmallVec<[Product; 4]> = SmallVec::with_capacity(self.products.len());
        for (reagent, coefficient) in &self.products {
            products.push(Product {
                specific_heat: specific_heat(reagent)?,
                reagent: reagent.clone(),
                coefficient: *coefficient,
            });
        }

        let consumed_heat_capacity = reactants
            .iter()
            .filter(|r| !r.catalyst)
            .map(|r| r.coefficient.to_f32() * r.specific_heat)
            .sum();
        let product_heat_capacity = products
            .iter()
            .map(|p| p.coefficient.to_f32() * p.specific_heat)
            .sum();
        let consumed_volume: Quantity = reactants
            .iter()
            .filter(|r| !r.catalyst)
            .map(|r| r.coefficient)
            .sum();
        let product_volume: Quantity = products.iter().map(|p| p.coefficient).sum();

        let definition = ReactionDefinition {
            id: self.id,
            priority: self.priority,
            reactants,
            products,
            min_temperature: self.min_temperature,
            max_temperature: self.max_temperature,
            heat_delta: self.heat_delta,
            product_temperature: self.product_temperature,
            rate: self.rate,
            quantized: self.quantized,
            can_overflow: self.can_overflow,
            mixing: self.mixing,
            start_effects: self.start_effects,
            step_effects: self.step_effects,
            stop_effects: self.stop_effects,
            consumed_heat_capacity,
            product_heat_capacity,
            volume_delta: product_volume - consumed_volume,
        };
        definition.validate()?;
        Ok(definition)
    }
}
