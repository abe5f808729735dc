//! Alembic: continuous chemical reaction simulation.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Alembic sub-crates. For most users, adding `alembic` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use alembic::prelude::*;
//!
//! let registry: ReagentRegistry = ["x", "y"].into_iter().map(Reagent::from).collect();
//! let reaction = ReactionDefinition::builder("x_to_y")
//!     .reactant("x", Quantity::new(2))
//!     .product("y", Quantity::new(1))
//!     .build(&registry)
//!     .unwrap();
//!
//! let mut catalog = ReactionCatalog::new();
//! catalog.index([reaction]);
//! let mut engine = ReactionEngine::new(EngineConfig::default(), catalog).unwrap();
//!
//! let key = SolutionKey::new(1u64, 0u32);
//! let mut host = SolutionTable::new();
//! let x = registry.get("x").unwrap();
//! host.insert(key, Solution::new(Quantity::new(100)).with_reagent(x, Quantity::new(10)));
//!
//! engine.update_now(key, Duration::ZERO, &mut host).unwrap();
//! let solution = host.get(key).unwrap();
//! assert_eq!(solution.quantity("x"), Quantity::ZERO);
//! assert_eq!(solution.quantity("y"), Quantity::new(5));
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `alembic-core` | IDs, quantities, reagents, solutions, the solution mutator |
//! | [`reaction`] | `alembic-reaction` | Definitions, prototypes, catalog, evaluator, lifecycle, effects |
//! | [`engine`] | `alembic-engine` | Cascade driver, update scheduler, trackers, metrics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`alembic-core`).
///
/// Contains [`types::Quantity`], the reagent registry, [`types::Solution`]
/// and [`types::apply`], the single place solutions are mutated by
/// reactions.
pub use alembic_core as types;

/// Reaction definitions and per-reaction logic (`alembic-reaction`).
///
/// Definitions are built with [`reaction::ReactionBuilder`] or loaded from
/// JSON through [`reaction::PrototypeSet`], then indexed in a
/// [`reaction::ReactionCatalog`].
pub use alembic_reaction as reaction;

/// The engine (`alembic-engine`).
///
/// [`engine::ReactionEngine`] drives every tracked solution on a fixed
/// cadence; hosts expose their solutions through [`engine::ReactionHost`].
pub use alembic_engine as engine;

/// Common imports for typical Alembic usage.
///
/// ```rust
/// use alembic::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use alembic_core::{
        ContainerId, Quantity, ReactionId, Reagent, ReagentId, ReagentRegistry, Solution,
        SolutionId, SolutionKey,
    };

    // Reactions
    pub use alembic_reaction::{
        AttemptListener, BuiltinEffect, EffectContext, EffectFlow, EffectPhase, MixingState,
        PrototypeSet, ReactionAttempt, ReactionCatalog, ReactionDefinition, ReactionEffect,
        ReactionPhase,
    };

    // Errors
    pub use alembic_core::QuantityError;
    pub use alembic_engine::{ConfigError, EngineError};
    pub use alembic_reaction::{DefinitionError, LoadError};

    // Engine
    pub use alembic_engine::{
        EngineConfig, ReactionEngine, ReactionHost, SolutionTable, UpdateMetrics, UpdateReport,
    };
}
