//! Cascade driver and update scheduler for the Alembic reaction engine.
//!
//! [`ReactionEngine`] keeps a sparse map from container to
//! [`ReactionTracker`] and drives each tracked solution's [`Cascade`] on a
//! fixed cadence ([`ReactionEngine::update_all`]) or on demand
//! ([`ReactionEngine::update_now`]). Solutions themselves stay with the
//! host, reached through the [`ReactionHost`] trait.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cascade;
pub mod config;
pub mod host;
pub mod metrics;
pub mod scheduler;
pub mod tracker;

pub use cascade::{Cascade, CascadeReport, ConvergenceFailure};
pub use config::{ConfigError, EngineConfig};
pub use host::{ReactionHost, SolutionTable};
pub use metrics::UpdateMetrics;
pub use scheduler::{EngineError, ReactionEngine, UpdateReport};
pub use tracker::{ActiveReaction, ReactionSet, ReactionTracker};
