//! Engine configuration, validation, and error types.

use std::error::Error;
use std::fmt;
use std::time::Duration;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected during [`EngineConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The cascade iteration cap is zero.
    ZeroIterationCap,
    /// An update interval given in seconds was NaN, infinite, or negative.
    InvalidUpdateInterval {
        /// The invalid value.
        value: f64,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroIterationCap => write!(f, "max_iterations must be at least 1"),
            Self::InvalidUpdateInterval { value } => {
                write!(f, "update interval must be finite and non-negative, got {value}")
            }
        }
    }
}

impl Error for ConfigError {}

// ── EngineConfig ───────────────────────────────────────────────────

/// Configuration for a [`ReactionEngine`](crate::ReactionEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Maximum cascade passes per solution per update. Default: 20.
    pub max_iterations: u32,
    /// Cadence at which `update_all` revisits a container. Zero means
    /// every call. Default: 1 s.
    pub update_interval: Duration,
    /// Seed for the effect RNG. Default: 0.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            update_interval: Duration::from_secs(1),
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Set the update interval from a float number of seconds.
    pub fn with_update_interval_secs(mut self, secs: f64) -> Result<Self, ConfigError> {
        if !secs.is_finite() || secs < 0.0 {
            return Err(ConfigError::InvalidUpdateInterval { value: secs });
        }
        self.update_interval = Duration::from_secs_f64(secs);
        Ok(self)
    }

    /// Set the RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the cascade iteration cap.
    pub fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterationCap);
        }
        Ok(())
    }
}
