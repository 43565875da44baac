//! Model metadata records

use crate::types::listing::PredictionKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Kind of estimator a model implements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Regression,
    Classification,
}

impl ModelType {
    /// Model type that serves a given prediction kind
    pub fn for_kind(kind: PredictionKind) -> Self {
        match kind {
            PredictionKind::Price => ModelType::Regression,
            PredictionKind::Demand => ModelType::Classification,
        }
    }
}

/// Descriptive record for a model. Read-only to the prediction core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub model_type: ModelType,
    pub version: String,
    /// Evaluation metrics (r2, rmse, accuracy, auc, ...)
    #[serde(default)]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default)]
    pub feature_importance: BTreeMap<String, f64>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
}

impl ModelMetadata {
    pub fn new(name: impl Into<String>, model_type: ModelType, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model_type,
            version: version.into(),
            metrics: BTreeMap::new(),
            feature_importance: BTreeMap::new(),
            is_active: true,
            trained_at: None,
        }
    }

    /// Version stamp attached to every prediction, e.g. `RandomForestRegressor-v1.0`
    pub fn version_label(&self) -> String {
        format!("{}-v{}", self.name, self.version)
    }
}

/// Set of known models, at most one active per model type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRegistry {
    pub models: Vec<ModelMetadata>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelMetadata>) -> Self {
        Self { models }
    }

    /// Active model serving `kind`. The first active entry wins.
    pub fn active(&self, kind: PredictionKind) -> Option<&ModelMetadata> {
        let model_type = ModelType::for_kind(kind);
        self.models
            .iter()
            .find(|m| m.is_active && m.model_type == model_type)
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self {
            models: vec![
                ModelMetadata::new("RandomForestRegressor", ModelType::Regression, "1.0"),
                ModelMetadata::new("LightGBMClassifier", ModelType::Classification, "1.0"),
            ],
        }
    }
}
