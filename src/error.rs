//! Error taxonomy for the prediction core

use thiserror::Error;

/// Errors surfaced to the caller of a prediction.
///
/// Unrecognized categorical values are not errors; they degrade to fallback
/// features and are reported through [`crate::feature_extractor::DegradedFeature`].
/// Persistence failures never reach this type either.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("No model available for {0} predictions")]
    ModelUnavailable(String),
}

impl PredictionError {
    pub fn invalid(message: impl Into<String>) -> Self {
        PredictionError::InvalidRequest(message.into())
    }
}
