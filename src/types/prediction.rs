//! Prediction results and persistence records

use crate::feature_extractor::FeatureMap;
use crate::types::listing::PredictionKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Demand classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DemandClass {
    #[serde(rename = "high-demand")]
    HighDemand,
    #[serde(rename = "low-demand")]
    LowDemand,
}

impl DemandClass {
    /// High demand iff the probability is strictly above one half
    pub fn from_probability(probability: f64) -> Self {
        if probability > 0.5 {
            DemandClass::HighDemand
        } else {
            DemandClass::LowDemand
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DemandClass::HighDemand => "high-demand",
            DemandClass::LowDemand => "low-demand",
        }
    }
}

impl fmt::Display for DemandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point estimate produced by a scoring path
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "prediction_type", rename_all = "lowercase")]
pub enum PredictionOutcome {
    Price {
        /// Nightly price, rounded to cents, never below the configured floor
        predicted_price: f64,
        /// Self-reported confidence in [0, 1], 4 decimal places
        confidence: f64,
    },
    Demand {
        predicted_class: DemandClass,
        /// Probability of high demand in [0.01, 0.99], 4 decimal places
        probability: f64,
    },
}

impl PredictionOutcome {
    pub fn kind(&self) -> PredictionKind {
        match self {
            PredictionOutcome::Price { .. } => PredictionKind::Price,
            PredictionOutcome::Demand { .. } => PredictionKind::Demand,
        }
    }

    /// Confidence for price, probability for demand
    pub fn confidence_score(&self) -> f64 {
        match self {
            PredictionOutcome::Price { confidence, .. } => *confidence,
            PredictionOutcome::Demand { probability, .. } => *probability,
        }
    }
}

/// Response returned to the caller for a successful prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Durable identifier from the recorder; `None` when persistence failed
    pub prediction_id: Option<String>,
    #[serde(flatten)]
    pub outcome: PredictionOutcome,
    pub model_version: String,
}

impl PredictionResult {
    pub fn new(outcome: PredictionOutcome, model_version: impl Into<String>) -> Self {
        Self {
            prediction_id: None,
            outcome,
            model_version: model_version.into(),
        }
    }

    pub fn with_prediction_id(mut self, prediction_id: Option<String>) -> Self {
        self.prediction_id = prediction_id;
        self
    }

    /// Build the record handed to the prediction recorder
    pub fn to_record(&self, features: &FeatureMap) -> PredictionRecord {
        let (predicted_value, predicted_class) = match &self.outcome {
            PredictionOutcome::Price {
                predicted_price, ..
            } => (Some(*predicted_price), None),
            PredictionOutcome::Demand {
                predicted_class, ..
            } => (None, Some(*predicted_class)),
        };

        PredictionRecord {
            prediction_type: self.outcome.kind(),
            predicted_value,
            predicted_class,
            confidence_score: self.outcome.confidence_score(),
            model_version: self.model_version.clone(),
            input_features: features.clone(),
        }
    }
}

/// Row persisted by the prediction recorder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub prediction_type: PredictionKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predicted_value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub predicted_class: Option<DemandClass>,
    pub confidence_score: f64,
    pub model_version: String,
    pub input_features: FeatureMap,
}

/// Error body returned on failure; no partial results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl fmt::Display) -> Self {
        Self {
            error: error.to_string(),
        }
    }
}
