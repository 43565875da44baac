//! Type definitions for the listing prediction service

pub mod listing;
pub mod metadata;
pub mod prediction;

pub use listing::{NeighbourhoodGroup, PredictionKind, PredictionRequest, RawListing, RoomType};
pub use metadata::{ModelMetadata, ModelRegistry, ModelType};
pub use prediction::{
    DemandClass, ErrorResponse, PredictionOutcome, PredictionRecord, PredictionResult,
};
