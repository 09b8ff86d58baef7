//! Error types for the display manager.

use display_scaling::DisplayId;
use thiserror::Error;

/// Errors that can occur while tracking displays.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DisplayError {
    /// The host display bridge is missing or not ready.
    #[error("Display host unavailable: {0}")]
    HostUnavailable(String),

    /// No attached display has the requested id.
    #[error("Display not found: {0}")]
    DisplayNotFound(DisplayId),

    /// Deriving resolution state failed unexpectedly.
    #[error("Computation failure: {0}")]
    ComputationFailure(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DisplayError {
    /// Returns true if the engine keeps working after this error.
    ///
    /// Only configuration errors are fatal; everything else is reported and the
    /// next refresh or host event can recover.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }

    /// Returns true if the error means results are degraded rather than rejected.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::HostUnavailable(_) | Self::ComputationFailure(_))
    }

    /// Build a `ComputationFailure` from a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "unknown panic".to_string()
        };
        Self::ComputationFailure(message)
    }
}
