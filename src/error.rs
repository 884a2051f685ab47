//! Unified error handling for the hotspot engine.
//!
//! Every fallible operation returns [`Result`]. Negative duplicate verdicts
//! and degenerate clustering input are normal outcomes, not errors; only
//! malformed input and invalid configuration are reported here.

use thiserror::Error;

/// Errors raised by clustering, parameter estimation and duplicate checks.
#[derive(Debug, Error)]
pub enum GeoEngineError {
    /// A required field was missing or malformed.
    #[error("invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// A clustering input point is non-finite or out of range.
    #[error("invalid point at index {index}: ({latitude}, {longitude})")]
    InvalidPoint {
        index: usize,
        latitude: f64,
        longitude: f64,
    },

    /// A parameter or registry value cannot be used.
    #[error("invalid configuration for {parameter}: {reason}")]
    Configuration { parameter: String, reason: String },

    /// The category registry JSON could not be parsed.
    #[error("failed to parse category registry: {0}")]
    RegistryParse(#[from] serde_json::Error),
}

impl GeoEngineError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GeoEngineError>;

/// Convert a missing optional field into [`GeoEngineError::InvalidInput`].
pub trait OptionExt<T> {
    fn ok_or_missing(self, field: &str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_missing(self, field: &str) -> Result<T> {
        self.ok_or_else(|| GeoEngineError::invalid_input(field, "missing"))
    }
}
