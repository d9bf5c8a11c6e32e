//! Error types for the advisory core.
//!
//! Query-time failures are typed so the HTTP layer can tell a client mistake
//! (bad input, unknown region) from a deployment problem (missing or broken
//! model artifact). Load-time code uses `anyhow` with context instead.

use thiserror::Error;

/// Errors raised by the scorer, the rainfall aggregator and the planners
#[derive(Error, Debug)]
pub enum AdvisorError {
    /// Client-supplied value could not be interpreted
    #[error("Invalid value for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Model artifact is absent from its configured location
    #[error("Model not found at {path}. Train and export the recommender first")]
    ModelNotFound { path: String },

    /// Artifact is present but unusable (corrupt, wrong shape)
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Region has no rows in the historical rainfall table
    #[error("No data found for region '{0}'")]
    RegionNotFound(String),
}

impl AdvisorError {
    pub fn invalid_input(field: impl Into<String>, reason: impl Into<String>) -> Self {
        AdvisorError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias for results carrying [`AdvisorError`]
pub type Result<T> = std::result::Result<T, AdvisorError>;
