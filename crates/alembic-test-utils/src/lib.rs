//! Test fixtures and recording hooks for Alembic development.
//!
//! Provides a standard reagent registry, reaction builders for the common
//! scenarios, and hook implementations ([`RecordingEffect`],
//! [`VetoListener`]) that record what the engine did to them.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::*;

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process.
///
/// Safe to call from every test; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
