//! Listing Predictor Library
//!
//! Feature engineering and heuristic scoring for short-term rental listings:
//! nightly price estimation and high/low demand classification, served over
//! NATS request/reply.

pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod recorder;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::PredictionError;
pub use feature_extractor::{FeatureExtractor, FeatureMap, NeighbourhoodFrequencies};
pub use models::inference::InferenceEngine;
pub use recorder::{InMemoryRecorder, NatsRecorder, PredictionRecorder};
pub use service::PredictionService;
pub use types::{
    listing::{PredictionKind, PredictionRequest, RawListing},
    prediction::{PredictionOutcome, PredictionResult},
};
