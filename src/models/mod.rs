//! Scoring components

pub mod aggregator;
pub mod heuristic;
pub mod inference;
pub mod loader;
pub mod noise;

pub use aggregator::LinearCombiner;
pub use heuristic::{HeuristicDemandModel, HeuristicPriceModel};
pub use inference::{InferenceEngine, PredictionModel};
pub use loader::MetadataLoader;
pub use noise::{FixedNoise, NoiseSource, RngNoise};
