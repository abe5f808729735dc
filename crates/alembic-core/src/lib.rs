//! Core types for the Alembic reaction engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the data the reaction pipeline operates on: identifiers, the
//! fixed-point [`Quantity`], the [`ReagentRegistry`], and the
//! [`Solution`] together with its mutator ([`apply`]).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod id;
pub mod mutator;
pub mod quantity;
pub mod reagent;
pub mod solution;

pub use error::QuantityError;
pub use id::{ContainerId, ReactionId, ReagentId, SolutionId, SolutionKey};
pub use mutator::{apply, MutationReport, ProducedReagent};
pub use quantity::Quantity;
pub use reagent::{Reagent, ReagentRegistry};
pub use solution::{Solution, SolutionEntry, T20C};
