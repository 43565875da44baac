//! Model metadata loader

use crate::types::listing::PredictionKind;
use crate::types::metadata::ModelRegistry;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

/// Loader for the model metadata registry
pub struct MetadataLoader;

impl MetadataLoader {
    /// Load a registry from a JSON file
    pub fn load_registry<P: AsRef<Path>>(path: P) -> Result<ModelRegistry> {
        let path = path.as_ref();

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read model metadata from {:?}", path))?;
        let registry: ModelRegistry = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse model metadata from {:?}", path))?;

        for kind in [PredictionKind::Price, PredictionKind::Demand] {
            match registry.active(kind) {
                Some(model) => info!(
                    kind = %kind,
                    model = %model.name,
                    version = %model.version,
                    "Active model metadata loaded"
                ),
                None => warn!(kind = %kind, path = %path.display(), "No active model in registry"),
            }
        }

        Ok(registry)
    }

    /// Load a registry, falling back to the built-in defaults when the file
    /// is missing or unreadable.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> ModelRegistry {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "Model metadata not found, using defaults");
            return ModelRegistry::default();
        }

        match Self::load_registry(path) {
            Ok(registry) => registry,
            Err(e) => {
                warn!(error = %e, "Failed to load model metadata, using defaults");
                ModelRegistry::default()
            }
        }
    }
}
