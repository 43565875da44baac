//! Inference engine dispatching listings to price and demand models

use crate::config::AppConfig;
use crate::error::PredictionError;
use crate::feature_extractor::FeatureMap;
use crate::models::heuristic::{HeuristicDemandModel, HeuristicPriceModel};
use crate::models::noise::NoiseSource;
use crate::types::listing::PredictionKind;
use crate::types::metadata::ModelRegistry;
use crate::types::prediction::{PredictionOutcome, PredictionResult};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// A scoring function for one prediction kind.
///
/// Implementations must accept any feature mapping, including empty or
/// all-zero ones, and keep their outputs inside the ranges published by
/// [`crate::types::PredictionOutcome`]. All randomness comes from `noise`.
pub trait PredictionModel: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Kind of prediction this model serves
    fn kind(&self) -> PredictionKind;

    fn predict(
        &self,
        features: &FeatureMap,
        noise: &mut dyn NoiseSource,
    ) -> PredictionOutcome;
}

/// Routes feature mappings to the model registered for each kind and stamps
/// results with the active model version.
pub struct InferenceEngine {
    models: HashMap<PredictionKind, Box<dyn PredictionModel>>,
    registry: ModelRegistry,
}

impl InferenceEngine {
    /// Create the heuristic engine from configuration
    pub fn new(config: &AppConfig, registry: ModelRegistry) -> Self {
        let models: Vec<Box<dyn PredictionModel>> = vec![
            Box::new(HeuristicPriceModel::new(config.scoring.price.clone())),
            Box::new(HeuristicDemandModel::new(config.scoring.demand.clone())),
        ];
        let engine = Self::with_models(models, registry);

        info!(
            models = ?engine.model_names(),
            price_version = %engine.model_version(PredictionKind::Price),
            demand_version = %engine.model_version(PredictionKind::Demand),
            "Inference engine initialized"
        );

        engine
    }

    /// Create an engine over arbitrary models. A later model for the same
    /// kind replaces an earlier one.
    pub fn with_models(models: Vec<Box<dyn PredictionModel>>, registry: ModelRegistry) -> Self {
        let mut by_kind = HashMap::new();
        for model in models {
            if let Some(replaced) = by_kind.insert(model.kind(), model) {
                warn!(model = %replaced.name(), "Model replaced by a later registration");
            }
        }

        Self {
            models: by_kind,
            registry,
        }
    }

    /// Get the number of registered models
    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    /// Get registered model names
    pub fn model_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.models.values().map(|m| m.name().to_string()).collect();
        names.sort();
        names
    }

    /// Whether a model is registered for `kind`
    pub fn has_model(&self, kind: PredictionKind) -> bool {
        self.models.contains_key(&kind)
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// Version stamp of the active model for `kind`.
    ///
    /// Falls back to the built-in defaults when the registry has no active
    /// model of the right type.
    pub fn model_version(&self, kind: PredictionKind) -> String {
        self.registry
            .active(kind)
            .map(|m| m.version_label())
            .or_else(|| ModelRegistry::default().active(kind).map(|m| m.version_label()))
            .unwrap_or_else(|| format!("{}-unversioned", kind))
    }

    /// Score a feature mapping with the model for `kind`
    pub fn predict(
        &self,
        kind: PredictionKind,
        features: &FeatureMap,
        noise: &mut dyn NoiseSource,
    ) -> Result<PredictionResult, PredictionError> {
        let model = self
            .models
            .get(&kind)
            .ok_or_else(|| PredictionError::ModelUnavailable(kind.to_string()))?;

        let outcome = model.predict(features, noise);

        debug!(
            kind = %kind,
            model = %model.name(),
            outcome = ?outcome,
            "Inference complete"
        );

        Ok(PredictionResult::new(outcome, self.model_version(kind)))
    }

    /// Run inference on a batch of feature mappings sharing one noise source
    pub fn predict_batch(
        &self,
        kind: PredictionKind,
        features_batch: &[FeatureMap],
        noise: &mut dyn NoiseSource,
    ) -> Vec<Result<PredictionResult, PredictionError>> {
        features_batch
            .iter()
            .map(|f| self.predict(kind, f, noise))
            .collect()
    }
}
