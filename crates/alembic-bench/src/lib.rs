//! Benchmark profiles for the Alembic reaction engine.
//!
//! - [`chain_catalog`]: a linear chain `c0 -> c1 -> ... -> cN` of
//!   instantaneous conversions, for cascade depth.
//! - [`reference_profile`]: many containers running slow, catalysed
//!   reactions, for scheduler throughput.
//! - [`initial_amounts`]: deterministic per-solution starting quantities.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::error::Error;
use std::time::Duration;

use alembic_core::{Quantity, Reagent, ReagentRegistry, Solution, SolutionKey};
use alembic_engine::{EngineConfig, ReactionEngine, SolutionTable};
use alembic_reaction::{DefinitionError, ReactionCatalog, ReactionDefinition};

/// Reagents `c0..=cN` plus the catalyst `cat`.
pub fn chain_registry(length: usize) -> ReagentRegistry {
    let mut registry: ReagentRegistry = (0..=length)
        .map(|i| Reagent::new(format!("c{i}"), 1.0 + i as f32 * 0.1))
        .collect();
    registry.insert(Reagent::new("cat", 1.0));
    registry
}

/// Build `length` conversions `c{i} -> c{i+1}`.
///
/// With `rate = None` every step is instantaneous, so one update walks the
/// whole chain. Each step releases a little heat.
pub fn chain_catalog(length: usize, rate: Option<f32>) -> Result<ReactionCatalog, DefinitionError> {
    let registry = chain_registry(length);
    let mut definitions = Vec::with_capacity(length);
    for i in 0..length {
        let mut builder = ReactionDefinition::builder(format!("step{i}"))
            .reactant(format!("c{i}"), Quantity::ONE)
            .catalyst("cat", Quantity::ONE)
            .product(format!("c{}", i + 1), Quantity::ONE)
            .heat_delta(0.5);
        if let Some(rate) = rate {
            builder = builder.rate(rate);
        }
        definitions.push(builder.build(&registry)?);
    }
    let mut catalog = ReactionCatalog::new();
    catalog.index(definitions);
    Ok(catalog)
}

/// A populated engine and host.
pub struct BenchWorld {
    /// The engine under test.
    pub engine: ReactionEngine,
    /// Solutions, one per container.
    pub host: SolutionTable,
    /// Every solution key, in insertion order.
    pub keys: Vec<SolutionKey>,
}

/// `containers` solutions, each holding `c0` and the catalyst, reacting
/// along a chain of 4 slow steps.
///
/// Every solution is kicked with `update_now` so all containers are
/// tracked when the profile is returned.
pub fn reference_profile(containers: u64, seed: u64) -> Result<BenchWorld, Box<dyn Error>> {
    let registry = chain_registry(4);
    let catalog = chain_catalog(4, Some(0.5))?;
    let config = EngineConfig::default().with_seed(seed);
    let mut engine = ReactionEngine::new(config, catalog)?;

    let mut host = SolutionTable::new();
    let mut keys = Vec::with_capacity(containers as usize);
    for (container, amount) in (0..containers).zip(initial_amounts(containers as usize, seed)) {
        let key = SolutionKey::new(container, 0u32);
        let mut solution = Solution::new(Quantity::new(200));
        for (id, quantity) in [("c0", amount), ("cat", Quantity::ONE)] {
            if let Some(reagent) = registry.get(id) {
                solution.add_reagent(reagent, quantity);
            }
        }
        host.insert(key, solution);
        engine.update_now(key, Duration::ZERO, &mut host)?;
        keys.push(key);
    }

    Ok(BenchWorld { engine, host, keys })
}

/// Deterministic starting quantities between 10 and 100 units.
pub fn initial_amounts(n: usize, seed: u64) -> Vec<Quantity> {
    (0..n as u64)
        .map(|i| {
            let h = seed
                .wrapping_mul(6364136223846793005)
                .wrapping_add(i.wrapping_mul(1442695040888963407));
            Quantity::from_raw(1000 + (h >> 33) as i64 % 9000)
        })
        .collect()
}
