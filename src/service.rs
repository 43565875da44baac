//! Request orchestration: validate, extract, score, record.

use crate::error::PredictionError;
use crate::feature_extractor::{FeatureExtractor, FeatureMap};
use crate::metrics::PipelineMetrics;
use crate::models::inference::InferenceEngine;
use crate::models::noise::NoiseSource;
use crate::recorder::PredictionRecorder;
use crate::types::listing::{PredictionKind, PredictionRequest};
use crate::types::prediction::{ErrorResponse, PredictionRecord, PredictionResult};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

/// Spawn `task` to run once a worker permit is available.
///
/// Returns immediately; the wait for a permit happens inside the spawned task.
pub fn spawn_with_permit<F>(semaphore: Arc<Semaphore>, task: F) -> JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let Ok(_permit) = semaphore.acquire_owned().await else {
            error!("Worker semaphore closed, dropping request");
            return;
        };
        task.await;
    })
}

/// Which scoring components are ready to serve
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelsLoaded {
    pub price_model: bool,
    pub demand_model: bool,
    pub feature_columns: bool,
}

/// Reply on the health subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    /// `healthy` when every component is loaded, `degraded` otherwise
    pub status: &'static str,
    pub models_loaded: ModelsLoaded,
    pub model_count: usize,
    pub models: Vec<String>,
}

/// Serves prediction requests end to end.
///
/// Scoring failures are returned to the caller; recorder failures are logged
/// and the result goes out without a `prediction_id`.
pub struct PredictionService<R> {
    extractor: FeatureExtractor,
    engine: InferenceEngine,
    recorder: R,
    metrics: Arc<PipelineMetrics>,
    record_timeout: Duration,
}

impl<R: PredictionRecorder> PredictionService<R> {
    pub fn new(
        extractor: FeatureExtractor,
        engine: InferenceEngine,
        recorder: R,
        metrics: Arc<PipelineMetrics>,
        record_timeout: Duration,
    ) -> Self {
        Self {
            extractor,
            engine,
            recorder,
            metrics,
            record_timeout,
        }
    }

    /// Validate and score a request without persisting it.
    ///
    /// Returns the result together with the features it was scored from.
    pub fn score(
        &self,
        request: &PredictionRequest,
        noise: &mut dyn NoiseSource,
    ) -> Result<(PredictionResult, FeatureMap), PredictionError> {
        let kind = request.validate().inspect_err(|e| {
            self.metrics.record_invalid();
            debug!(error = %e, "Rejected prediction request");
        })?;

        for degraded in self.extractor.degraded_features(&request.listing) {
            warn!(
                field = degraded.field(),
                value = %degraded.value(),
                "Unrecognized categorical value, using fallback features"
            );
            self.metrics.record_degraded(degraded.field());
        }

        let features = self.extractor.extract(&request.listing);
        let result = self.engine.predict(kind, &features, noise)?;

        Ok((result, features))
    }

    /// Score a request and record it. Persistence never fails the request.
    pub async fn handle<N: NoiseSource>(
        &self,
        request: &PredictionRequest,
        noise: &mut N,
    ) -> Result<PredictionResult, PredictionError> {
        let start = Instant::now();

        let (result, features) = self.score(request, noise)?;
        let prediction_id = self.persist(&result.to_record(&features)).await;

        self.metrics.record_prediction(&result.outcome, start.elapsed());
        Ok(result.with_prediction_id(prediction_id))
    }

    /// Decode a JSON request, handle it and encode the JSON reply
    pub async fn handle_payload<N: NoiseSource>(&self, payload: &[u8], noise: &mut N) -> Vec<u8> {
        let outcome = match PredictionRequest::from_json(payload) {
            Ok(request) => self.handle(&request, noise).await,
            Err(e) => {
                self.metrics.record_invalid();
                Err(e)
            }
        };

        let encoded = match &outcome {
            Ok(result) => serde_json::to_vec(result),
            Err(e) => serde_json::to_vec(&ErrorResponse::new(e)),
        };
        encoded.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to encode reply");
            br#"{"error":"Internal error"}"#.to_vec()
        })
    }

    async fn persist(&self, record: &PredictionRecord) -> Option<String> {
        match tokio::time::timeout(self.record_timeout, self.recorder.record(record)).await {
            Ok(Ok(id)) => Some(id),
            Ok(Err(e)) => {
                warn!(error = %e, "Failed to record prediction");
                self.metrics.record_persistence_failure();
                None
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.record_timeout.as_millis() as u64,
                    "Recording prediction timed out"
                );
                self.metrics.record_persistence_failure();
                None
            }
        }
    }

    /// Report which models and feature columns are available
    pub fn health(&self) -> HealthReport {
        let models_loaded = ModelsLoaded {
            price_model: self.engine.has_model(PredictionKind::Price),
            demand_model: self.engine.has_model(PredictionKind::Demand),
            feature_columns: self.extractor.feature_count() > 0,
        };
        let healthy =
            models_loaded.price_model && models_loaded.demand_model && models_loaded.feature_columns;

        HealthReport {
            status: if healthy { "healthy" } else { "degraded" },
            models_loaded,
            model_count: self.engine.model_count(),
            models: self.engine.model_names(),
        }
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn recorder(&self) -> &R {
        &self.recorder
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }
}
