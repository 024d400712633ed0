//! Crate-wide error type.
//!
//! Every fallible operation returns [`Result`]. Parameter structs validate
//! before any integration starts, so a malformed configuration surfaces as
//! [`Error::InvalidParameter`] and never as a NaN trajectory.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

/// Failure modes of the binding, information and gate layers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A parameter is outside its domain (non-positive rate, temperature, Hill
    /// coefficient, non-finite input, zero bin count, ...).
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the public API.
        name: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },

    /// Mutual information cannot be estimated from the supplied samples
    /// (empty input, zero total histogram mass, zero-variance sample).
    #[error("indeterminate information: {0}")]
    IndeterminateInformation(String),

    /// Two inputs that must agree in length or shape do not.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// The time grid is empty, non-finite or not ascending.
    #[error("invalid time grid: {0}")]
    InvalidTimeGrid(String),

    /// The ODE solver could not advance the state.
    #[error("integration failed at t = {t}: {reason}")]
    IntegrationFailed {
        /// Time reached when the solver gave up.
        t: f64,
        /// Cause (step budget, step-size underflow, singular iteration matrix, ...).
        reason: String,
    },

    /// A gate network references a node name that was never declared.
    #[error("unknown gate node `{0}`")]
    UnknownNode(String),

    /// A gate network wiring would read a value that is not yet known.
    #[error("invalid gate wiring: {0}")]
    InvalidWiring(String),
}

impl Error {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Error::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

/// Reject NaN and infinities.
pub(crate) fn ensure_finite(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("must be finite, got {value}")))
    }
}

/// Reject values that are not finite and strictly positive.
pub(crate) fn ensure_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("must be finite and > 0, got {value}")))
    }
}

/// Reject values that are not finite and non-negative.
pub(crate) fn ensure_non_negative(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(Error::invalid(name, format!("must be finite and >= 0, got {value}")))
    }
}
