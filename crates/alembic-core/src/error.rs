//! Error types for the core data model.

use std::error::Error;
use std::fmt;

/// Errors from converting floating-point values into a [`Quantity`](crate::Quantity).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum QuantityError {
    /// The value was NaN or infinite.
    NotFinite {
        /// The rejected value.
        value: f64,
    },
    /// The value does not fit in the fixed-point range.
    OutOfRange {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFinite { value } => write!(f, "quantity must be finite, got {value}"),
            Self::OutOfRange { value } => {
                write!(f, "quantity {value} is outside the fixed-point range")
            }
        }
    }
}

impl Error for QuantityError {}
