//! Reaction definitions and the per-reaction half of the pipeline.
//!
//! - [`definition`]: immutable [`ReactionDefinition`]s and their builder.
//! - [`prototype`]: serde-loadable reaction and reagent prototypes.
//! - [`catalog`]: the [`ReactionCatalog`] index from reagent to reactions.
//! - [`evaluator`]: [`can_react`], deciding how far a reaction may advance.
//! - [`lifecycle`]: the per-(solution, reaction) state machine.
//! - [`effect`]: start/step/stop effect hooks.
//! - [`mixing`]: mixing categories reported by external mixers.
//!
//! Solution-level orchestration (cascades, scheduling) lives in
//! `alembic-engine`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod catalog;
pub mod definition;
pub mod effect;
pub mod error;
pub mod evaluator;
pub mod lifecycle;
pub mod mixing;
pub mod prototype;

pub use catalog::{IndexReport, ReactionCatalog, ReloadSummary};
pub use definition::{
    Product, ReactionBuilder, ReactionDefinition, ReactionOrder, ReactionRate, Reactant,
};
pub use effect::{
    BuiltinEffect, EffectContext, EffectFlow, EffectPhase, EffectScope, LogImpact,
    ReactionEffect,
};
pub use error::{DefinitionError, LoadError};
pub use evaluator::{can_react, AttemptListener, BlockReason, Evaluation, ReactionAttempt, Viability};
pub use lifecycle::{AdvanceOutcome, LifecycleContext, ReactionPhase, ReactionState};
pub use mixing::{MixingCategory, MixingRequirement, MixingState};
pub use prototype::{BuiltPrototypes, PrototypeSet, ReactantPrototype, ReactionPrototype};
