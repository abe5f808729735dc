//! Serde-loadable reagent and reaction prototypes.
//!
//! A [`PrototypeSet`] is the parsed form of a configuration document:
//!
//! ```json
//! {
//!   "reagents": [{ "id": "x", "specific_heat": 2.0 }, { "id": "y" }],
//!   "reactions": [{
//!     "id": "x_to_y",
//!     "reactants": { "x": { "amount": 2 } },
//!     "products": { "y": 1 },
//!     "min_temp": 250.0
//!   }]
//! }
//! ```
//!
//! [`PrototypeSet::build`] turns it into a [`ReagentRegistry`] plus
//! validated [`ReactionDefinition`]s. Invalid reactions are returned as
//! errors alongside the valid ones rather than failing the whole set.

use std::sync::Arc;

use alembic_core::{Quantity, ReactionId, Reagent, ReagentId, ReagentRegistry};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::definition::ReactionDefinition;
use crate::effect::{BuiltinEffect, EffectPhase, ReactionEffect};
use crate::error::{DefinitionError, LoadError};
use crate::mixing::MixingCategory;

/// How a reactant takes part in a reaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactantPrototype {
    /// Units needed per unit of reaction.
    pub amount: Quantity,
    /// Required but not consumed.
    #[serde(default)]
    pub catalyst: bool,
}

fn default_true() -> bool {
    true
}

/// A reaction as written in configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReactionPrototype {
    /// Unique reaction id.
    pub id: ReactionId,
    /// Reactants keyed by reagent, in declaration order.
    pub reactants: IndexMap<ReagentId, ReactantPrototype>,
    /// Products keyed by reagent.
    #[serde(default)]
    pub products: IndexMap<ReagentId, Quantity>,
    /// Lower thermal bound; absent means unbounded.
    #[serde(default)]
    pub min_temp: Option<f32>,
    /// Upper thermal bound; absent means unbounded.
    #[serde(default)]
    pub max_temp: Option<f32>,
    /// Units per second; absent means instantaneous.
    #[serde(default)]
    pub rate: Option<f32>,
    /// Proceed only in whole units.
    #[serde(default)]
    pub quantized: bool,
    /// Thermal energy released per unit of reaction.
    #[serde(default)]
    pub heat_delta: f32,
    /// May produce more than the solution can hold.
    #[serde(default = "default_true")]
    pub can_overflow: bool,
    /// Evaluation priority.
    #[serde(default)]
    pub priority: i32,
    /// Mixing categories required to proceed.
    #[serde(default)]
    pub mixing_categories: Vec<MixingCategory>,
    /// Check mixing on every step instead of only at start.
    #[serde(default)]
    pub continuous_mixing: bool,
    /// Temperature products enter at.
    #[serde(default)]
    pub product_temperature: Option<f32>,
    /// Effects run when the reaction starts.
    #[serde(default)]
    pub start_effects: Vec<BuiltinEffect>,
    /// Effects run after each step.
    #[serde(default)]
    pub step_effects: Vec<BuiltinEffect>,
    /// Effects run when the reaction stops.
    #[serde(default)]
    pub stop_effects: Vec<BuiltinEffect>,
}

impl ReactionPrototype {
    /// Validate against `registry` and build a definition.
    pub fn build(&self, registry: &ReagentRegistry) -> Result<ReactionDefinition, DefinitionError> {
        let mut builder = ReactionDefinition::builder(self.id.clone())
            .priority(self.priority)
            .quantized(self.quantized)
            .can_overflow(self.can_overflow)
            .heat_delta(self.heat_delta);

        for (reagent, r) in &self.reactants {
            builder = if r.catalyst {
                builder.catalyst(reagent.clone(), r.amount)
            } else {
                builder.reactant(reagent.clone(), r.amount)
            };
        }
        for (reagent, amount) in &self.products {
            builder = builder.product(reagent.clone(), *amount);
        }
        if let Some(t) = self.min_temp {
            builder = builder.min_temperature(t);
        }
        if let Some(t) = self.max_temp {
            builder = builder.max_temperature(t);
        }
        if let Some(rate) = self.rate {
            builder = builder.rate(rate);
        }
        if let Some(t) = self.product_temperature {
            builder = builder.product_temperature(t);
        }
        if !self.mixing_categories.is_empty() {
            builder = builder.mixing(self.mixing_categories.iter().cloned(), self.continuous_mixing);
        }

        let phases = [
            (EffectPhase::Start, &self.start_effects),
            (EffectPhase::Step, &self.step_effects),
            (EffectPhase::Stop, &self.stop_effects),
        ];
        for (phase, effects) in phases {
            for effect in effects {
                let effect: Arc<dyn ReactionEffect> = Arc::new(effect.clone());
                builder = builder.effect(phase, effect);
            }
        }

        builder.build(registry)
    }
}

/// A whole configuration document.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PrototypeSet {
    /// Reagents and their physical properties.
    #[serde(default)]
    pub reagents: Vec<Reagent>,
    /// Reaction prototypes.
    #[serde(default)]
    pub reactions: Vec<ReactionPrototype>,
}

/// Output of [`PrototypeSet::build`].
#[derive(Debug, Default)]
pub struct BuiltPrototypes {
    /// Every reagent in the set.
    pub registry: ReagentRegistry,
    /// Reactions that passed validation, in document order.
    pub definitions: Vec<ReactionDefinition>,
    /// One error per rejected reaction.
    pub errors: Vec<DefinitionError>,
}

impl PrototypeSet {
    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Build the registry and every valid definition.
    ///
    /// Rejected reactions are logged and reported in
    /// [`BuiltPrototypes::errors`]; they never abort the rest of the set.
    pub fn build(&self) -> BuiltPrototypes {
        let registry: ReagentRegistry = self.reagents.iter().cloned().collect();
        let mut definitions = Vec::with_capacity(self.reactions.len());
        let mut errors = Vec::new();

        for prototype in &self.reactions {
            match prototype.build(&registry) {
                Ok(def) => definitions.push(def),
                Err(e) => {
                    warn!(reaction = %prototype.id, error = %e, "rejected reaction prototype");
                    errors.push(e);
                }
            }
        }

        BuiltPrototypes {
            registry,
            definitions,
            errors,
        }
    }
}
