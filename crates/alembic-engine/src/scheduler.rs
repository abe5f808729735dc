//! The update scheduler: owns trackers and drives cascades.
//!
//! [`ReactionEngine`] holds the catalog, a sparse map from container to
//! [`ReactionTracker`], the veto listeners, and a seeded RNG for effect
//! probabilities. The host calls [`update_all`] once per simulation tick
//! and [`update_now`] right after mutating a solution directly.
//!
//! [`update_all`]: ReactionEngine::update_all
//! [`update_now`]: ReactionEngine::update_now

use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};

use alembic_core::{ContainerId, Solution, SolutionKey};
use alembic_reaction::{
    AttemptListener, EffectScope, LifecycleContext, MixingState, ReactionCatalog,
    ReactionDefinition, ReloadSummary,
};
use indexmap::IndexMap;
use rand_chacha::rand_core::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use crate::cascade::{Cascade, CascadeReport, ConvergenceFailure};
use crate::config::{ConfigError, EngineConfig};
use crate::host::ReactionHost;
use crate::metrics::UpdateMetrics;
use crate::tracker::{ReactionSet, ReactionTracker};

// ── EngineError ────────────────────────────────────────────────────

/// Error returned from [`ReactionEngine::update_now()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// The host has no solution at this key.
    UnknownSolution {
        /// The requested key.
        key: SolutionKey,
    },
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSolution { key } => write!(f, "no solution at {key}"),
        }
    }
}

impl Error for EngineError {}

// ── UpdateReport ───────────────────────────────────────────────────

/// Result of [`ReactionEngine::update_all()`].
#[derive(Clone, Debug, Default)]
pub struct UpdateReport {
    /// Counters for this call.
    pub metrics: UpdateMetrics,
    /// Solutions whose cascade hit the iteration cap.
    pub failures: Vec<ConvergenceFailure>,
}

// ── ReactionEngine ─────────────────────────────────────────────────

/// The reaction engine.
///
/// Single-threaded: every call processes solutions to completion, one at a
/// time, in tracker insertion order.
pub struct ReactionEngine {
    config: EngineConfig,
    catalog: ReactionCatalog,
    trackers: IndexMap<ContainerId, ReactionTracker>,
    listeners: Vec<Box<dyn AttemptListener>>,
    rng: ChaCha8Rng,
    last_metrics: UpdateMetrics,
}

impl ReactionEngine {
    /// Construct an engine from a validated configuration and a catalog.
    pub fn new(config: EngineConfig, catalog: ReactionCatalog) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            catalog,
            trackers: IndexMap::new(),
            listeners: Vec::new(),
            last_metrics: UpdateMetrics::default(),
        })
    }

    /// Register a veto hook.
    pub fn add_listener(&mut self, listener: Box<dyn AttemptListener>) {
        self.listeners.push(listener);
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The reaction catalog.
    pub fn catalog(&self) -> &ReactionCatalog {
        &self.catalog
    }

    /// Metrics from the most recent update call.
    pub fn last_metrics(&self) -> &UpdateMetrics {
        &self.last_metrics
    }

    /// The tracker of `container`, if it has active reactions.
    pub fn tracker(&self, container: ContainerId) -> Option<&ReactionTracker> {
        self.trackers.get(&container)
    }

    /// Containers with active reactions.
    pub fn tracked_containers(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.trackers.keys().copied()
    }

    /// Active reactions of one solution.
    pub fn active_reactions(&self, key: SolutionKey) -> Option<&ReactionSet> {
        self.trackers.get(&key.container)?.solution(key.solution)
    }

    /// Revisit every container whose next update is due.
    pub fn update_all(&mut self, now: Duration, host: &mut dyn ReactionHost) -> UpdateReport {
        let start = Instant::now();
        let mut report = UpdateReport::default();

        let due: Vec<ContainerId> = self
            .trackers
            .iter()
            .filter(|(_, t)| t.is_due(now))
            .map(|(c, _)| *c)
            .collect();

        for container in due {
            let Some(tracker) = self.trackers.get_mut(&container) else {
                continue;
            };
            report.metrics.containers += 1;
            let mixing = host.mixing_state(container);
            let cascade = Cascade {
                catalog: &self.catalog,
                listeners: &self.listeners,
                mixing: &mixing,
                now,
                max_iterations: self.config.max_iterations,
                scope: EffectScope::All,
            };

            let ids: Vec<_> = tracker.solution_ids().collect();
            for id in ids {
                let key = SolutionKey {
                    container,
                    solution: id,
                };
                let Some(mut set) = tracker.take(id) else {
                    continue;
                };
                let Some(solution) = host.solution_mut(key) else {
                    debug!(solution = %key, "tracked solution vanished; dropping its reactions");
                    continue;
                };
                let cascade_report = cascade.run(key, solution, &mut set, Some(&mut self.rng));
                report.metrics.absorb(&cascade_report);
                report.failures.extend(cascade_report.convergence);
                tracker.put(id, set);
            }
            tracker.schedule(now + self.config.update_interval);
        }

        self.trackers.retain(|_, t| !t.is_empty());
        report.metrics.total_us = start.elapsed().as_micros() as u64;
        self.last_metrics = report.metrics.clone();
        report
    }

    /// Cascade one solution immediately, outside the normal cadence.
    ///
    /// Starts tracking the solution's container if a reaction becomes
    /// active.
    pub fn update_now(
        &mut self,
        key: SolutionKey,
        now: Duration,
        host: &mut dyn ReactionHost,
    ) -> Result<CascadeReport, EngineError> {
        let start = Instant::now();
        let mixing = host.mixing_state(key.container);
        let solution = host
            .solution_mut(key)
            .ok_or(EngineError::UnknownSolution { key })?;

        let mut set = self
            .trackers
            .get_mut(&key.container)
            .and_then(|t| t.take(key.solution))
            .unwrap_or_default();

        let cascade = Cascade {
            catalog: &self.catalog,
            listeners: &self.listeners,
            mixing: &mixing,
            now,
            max_iterations: self.config.max_iterations,
            scope: EffectScope::All,
        };
        let report = cascade.run(key, solution, &mut set, Some(&mut self.rng));

        if set.is_empty() {
            if self
                .trackers
                .get(&key.container)
                .is_some_and(ReactionTracker::is_empty)
            {
                self.trackers.shift_remove(&key.container);
            }
        } else {
            let interval = self.config.update_interval;
            self.trackers
                .entry(key.container)
                .or_insert_with(|| ReactionTracker::new(now + interval))
                .put(key.solution, set);
        }

        let mut metrics = UpdateMetrics {
            containers: 1,
            ..UpdateMetrics::default()
        };
        metrics.absorb(&report);
        metrics.total_us = start.elapsed().as_micros() as u64;
        self.last_metrics = metrics;
        Ok(report)
    }

    /// Run the cascade on a copy of `solution`.
    ///
    /// Only effects that change nothing but the solution run, drawing from
    /// a clone of the engine RNG. Trackers, the RNG and metrics are
    /// untouched, so the result can be discarded freely. Any reactions
    /// already active at `key` are taken into account.
    pub fn predict(
        &self,
        key: SolutionKey,
        solution: &Solution,
        mixing: &MixingState,
        now: Duration,
    ) -> (Solution, CascadeReport) {
        let mut predicted = solution.clone();
        let mut set = self.active_reactions(key).cloned().unwrap_or_default();
        let mut rng = self.rng.clone();
        let cascade = Cascade {
            catalog: &self.catalog,
            listeners: &self.listeners,
            mixing,
            now,
            max_iterations: self.config.max_iterations,
            scope: EffectScope::SolutionOnly,
        };
        let report = cascade.run(key, &mut predicted, &mut set, Some(&mut rng));
        (predicted, report)
    }

    /// Swap in a new definition set.
    ///
    /// Reactions whose definition changed or disappeared are cancelled
    /// immediately, running their old stop effects. Reactions in
    /// solutions the host no longer has are dropped silently.
    pub fn reload(
        &mut self,
        definitions: impl IntoIterator<Item = ReactionDefinition>,
        host: &mut dyn ReactionHost,
        now: Duration,
    ) -> ReloadSummary {
        let summary = self.catalog.reload(definitions);
        if summary.is_noop() {
            return summary;
        }

        let mut cancelled = 0u32;
        for (&container, tracker) in self.trackers.iter_mut() {
            let ids: Vec<_> = tracker.solution_ids().collect();
            for id in ids {
                let key = SolutionKey {
                    container,
                    solution: id,
                };
                let Some(set) = tracker.solution_mut(id) else {
                    continue;
                };
                let Some(solution) = host.solution_mut(key) else {
                    set.retain(|_, a| a.is_current(&self.catalog));
                    continue;
                };
                let mut ctx = LifecycleContext {
                    key,
                    now,
                    rng: Some(&mut self.rng),
                    scope: EffectScope::All,
                };
                set.retain(|_, a| {
                    if a.is_current(&self.catalog) {
                        return true;
                    }
                    a.state.cancel(&a.definition, solution, &mut ctx);
                    cancelled += 1;
                    false
                });
            }
            tracker.prune();
        }
        self.trackers.retain(|_, t| !t.is_empty());

        info!(cancelled, "reactions cancelled by reload");
        summary
    }

    /// Forget a destroyed container. No stop effects run.
    ///
    /// Returns whether the container was tracked.
    pub fn forget_container(&mut self, container: ContainerId) -> bool {
        let removed = self.trackers.shift_remove(&container).is_some();
        if removed {
            debug!(%container, "container forgotten");
        }
        removed
    }
}
