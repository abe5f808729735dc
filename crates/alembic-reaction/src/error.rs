//! Errors from building, loading, and indexing reaction definitions.
//!
//! These are configuration errors: they reject a single definition at load
//! or index time and are never fatal to a running simulation.

use std::error::Error;
use std::fmt;

use alembic_core::{ReactionId, ReagentId};

/// A reaction definition failed validation.
#[derive(Clone, Debug, PartialEq)]
pub enum DefinitionError {
    /// The reaction lists no reactants.
    EmptyReactants {
        /// The offending reaction.
        reaction: ReactionId,
    },
    /// A reactant or product coefficient is zero or negative.
    NonPositiveCoefficient {
        /// The offending reaction.
        reaction: ReactionId,
        /// The reagent carrying the bad coefficient.
        reagent: ReagentId,
    },
    /// A reactant or product is not in the reagent registry.
    UnknownReagent {
        /// The offending reaction.
        reaction: ReactionId,
        /// The unregistered reagent.
        reagent: ReagentId,
    },
    /// The same reagent is listed twice as a reactant.
    DuplicateReactant {
        /// The offending reaction.
        reaction: ReactionId,
        /// The repeated reagent.
        reagent: ReagentId,
    },
    /// The temperature window is NaN or `min > max`.
    InvalidTemperatureWindow {
        /// The offending reaction.
        reaction: ReactionId,
        /// Configured lower bound.
        min: f32,
        /// Configured upper bound.
        max: f32,
    },
    /// A finite reaction rate was NaN, zero, or negative.
    InvalidRate {
        /// The offending reaction.
        reaction: ReactionId,
        /// The invalid rate.
        value: f32,
    },
    /// A heat delta or product temperature was not finite (or the
    /// product temperature was negative).
    InvalidThermalProperty {
        /// The offending reaction.
        reaction: ReactionId,
        /// Which property was invalid.
        property: &'static str,
        /// The invalid value.
        value: f32,
    },
    /// Two definitions share an id.
    DuplicateId {
        /// The repeated id.
        reaction: ReactionId,
    },
}

impl DefinitionError {
    /// The reaction the error refers to.
    pub fn reaction(&self) -> &ReactionId {
        match self {
            Self::EmptyReactants { reaction }
            | Self::NonPositiveCoefficient { reaction, .. }
            | Self::UnknownReagent { reaction, .. }
            | Self::DuplicateReactant { reaction, .. }
            | Self::InvalidTemperatureWindow { reaction, .. }
            | Self::InvalidRate { reaction, .. }
            | Self::InvalidThermalProperty { reaction, .. }
            | Self::DuplicateId { reaction } => reaction,
        }
    }
}

impl fmt::Display for DefinitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyReactants { reaction } => {
                write!(f, "reaction '{reaction}' has no reactants")
            }
            Self::NonPositiveCoefficient { reaction, reagent } => {
                write!(
                    f,
                    "reaction '{reaction}' has a non-positive coefficient for '{reagent}'"
                )
            }
            Self::UnknownReagent { reaction, reagent } => {
                write!(f, "reaction '{reaction}' references unknown reagent '{reagent}'")
            }
            Self::DuplicateReactant { reaction, reagent } => {
                write!(f, "reaction '{reaction}' lists reactant '{reagent}' twice")
            }
            Self::InvalidTemperatureWindow { reaction, min, max } => {
                write!(
                    f,
                    "reaction '{reaction}' has an invalid temperature window [{min}, {max}]"
                )
            }
            Self::InvalidRate { reaction, value } => {
                write!(
                    f,
                    "reaction '{reaction}' rate must be positive or instantaneous, got {value}"
                )
            }
            Self::InvalidThermalProperty {
                reaction,
                property,
                value,
            } => {
                write!(f, "reaction '{reaction}' has invalid {property}: {value}")
            }
            Self::DuplicateId { reaction } => {
                write!(f, "reaction id '{reaction}' is defined more than once")
            }
        }
    }
}

impl Error for DefinitionError {}

/// A prototype document could not be loaded.
#[derive(Debug)]
pub enum LoadError {
    /// The document is not valid JSON for a [`PrototypeSet`](crate::PrototypeSet).
    Parse(serde_json::Error),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "prototype parse error: {e}"),
        }
    }
}

impl Error for LoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}
