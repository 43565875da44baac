//! Configuration management for the listing prediction service

use crate::feature_extractor::NeighbourhoodFrequencies;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub models: ModelsConfig,
    pub features: FeaturesConfig,
    pub scoring: ScoringConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests (request/reply)
    pub request_subject: String,
    /// Subject answering with the model metadata registry
    pub metadata_subject: String,
    /// Subject answering with model availability
    pub health_subject: String,
    /// Subject of the prediction recorder
    pub record_subject: String,
    /// Optional queue group so several instances share the request load
    pub queue_group: Option<String>,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "listings.predict".to_string(),
            metadata_subject: "listings.models.metadata".to_string(),
            health_subject: "listings.health".to_string(),
            record_subject: "listings.predictions.record".to_string(),
            queue_group: None,
        }
    }
}

/// Model metadata configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// JSON file holding the model metadata registry
    pub metadata_path: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            metadata_path: "config/metadata.json".to_string(),
        }
    }
}

/// Feature engineering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeaturesConfig {
    /// JSON object of neighbourhood -> frequency; built-in table when unset
    pub neighbourhood_table: Option<String>,
    /// Frequency assigned to neighbourhoods missing from the table
    pub fallback_frequency: f64,
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            neighbourhood_table: None,
            fallback_frequency: NeighbourhoodFrequencies::DEFAULT_FALLBACK,
        }
    }
}

impl FeaturesConfig {
    /// Build the neighbourhood frequency table this config points at
    pub fn load_frequencies(&self) -> Result<NeighbourhoodFrequencies> {
        match &self.neighbourhood_table {
            Some(path) => NeighbourhoodFrequencies::from_json_file(path, self.fallback_frequency),
            None => Ok(NeighbourhoodFrequencies::default().with_fallback(self.fallback_frequency)),
        }
    }
}

/// Scoring constants for both prediction paths
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Seed every request's noise source with this value (reproducible demos)
    pub seed: Option<u64>,
    pub price: PriceScoringConfig,
    pub demand: DemandScoringConfig,
}

/// Price path constants
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PriceScoringConfig {
    pub base_rate: f64,
    pub entire_home_offset: f64,
    pub private_room_offset: f64,
    pub manhattan_offset: f64,
    pub brooklyn_offset: f64,
    /// Multiplier on the neighbourhood frequency encoding
    pub neighbourhood_scale: f64,
    /// Price added per review
    pub reviews_coefficient: f64,
    /// Price added per monthly review
    pub reviews_per_month_coefficient: f64,
    /// Price removed per available day
    pub availability_penalty: f64,
    /// Price removed per degree of distance from the reference point
    pub distance_penalty: f64,
    pub reference_latitude: f64,
    pub reference_longitude: f64,
    /// Minimum viable price
    pub floor: f64,
    /// Noise is uniform in [-noise_band, noise_band]
    pub noise_band: f64,
    pub confidence_base: f64,
    /// Confidence is uniform in [base - jitter, base + jitter]
    pub confidence_jitter: f64,
}

impl Default for PriceScoringConfig {
    fn default() -> Self {
        Self {
            base_rate: 100.0,
            entire_home_offset: 80.0,
            private_room_offset: 30.0,
            manhattan_offset: 60.0,
            brooklyn_offset: 30.0,
            neighbourhood_scale: 500.0,
            reviews_coefficient: 0.5,
            reviews_per_month_coefficient: 10.0,
            availability_penalty: 0.05,
            distance_penalty: 200.0,
            // Times Square
            reference_latitude: 40.7580,
            reference_longitude: -73.9855,
            floor: 10.0,
            noise_band: 20.0,
            confidence_base: 0.85,
            confidence_jitter: 0.10,
        }
    }
}

/// A bonus awarded once a value crosses `threshold`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tier {
    pub threshold: f64,
    pub bonus: f64,
}

/// Two-step bonus: `strong` is checked first, then `mild`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Tiers {
    pub strong: Tier,
    pub mild: Tier,
}

impl Tiers {
    /// Bonus for values strictly below the thresholds
    pub fn bonus_below(&self, value: f64) -> f64 {
        if value < self.strong.threshold {
            self.strong.bonus
        } else if value < self.mild.threshold {
            self.mild.bonus
        } else {
            0.0
        }
    }

    /// Bonus for values strictly above the thresholds
    pub fn bonus_above(&self, value: f64) -> f64 {
        if value > self.strong.threshold {
            self.strong.bonus
        } else if value > self.mild.threshold {
            self.mild.bonus
        } else {
            0.0
        }
    }
}

/// Demand path constants. Scores live on a 0-100 scale.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemandScoringConfig {
    /// Bonus for low availability_ratio
    pub availability: Tiers,
    /// Bonus for high number_of_reviews
    pub reviews: Tiers,
    /// Bonus for high reviews_per_month
    pub reviews_per_month: Tiers,
    pub manhattan_bonus: f64,
    pub entire_home_bonus: f64,
    pub noise_band: f64,
}

impl Default for DemandScoringConfig {
    fn default() -> Self {
        Self {
            availability: Tiers {
                strong: Tier { threshold: 0.3, bonus: 30.0 },
                mild: Tier { threshold: 0.6, bonus: 15.0 },
            },
            reviews: Tiers {
                strong: Tier { threshold: 50.0, bonus: 20.0 },
                mild: Tier { threshold: 10.0, bonus: 10.0 },
            },
            reviews_per_month: Tiers {
                strong: Tier { threshold: 2.0, bonus: 20.0 },
                mild: Tier { threshold: 1.0, bonus: 10.0 },
            },
            manhattan_bonus: 15.0,
            entire_home_bonus: 10.0,
            noise_band: 5.0,
        }
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum number of requests processed concurrently
    pub workers: usize,
    /// Recorder calls slower than this count as persistence failures
    pub record_timeout_ms: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            record_timeout_ms: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// Environment variables prefixed with `PREDICTOR` override file values,
    /// e.g. `PREDICTOR_NATS__URL`.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_environment(path, Self::environment())
    }

    /// `PREDICTOR_<SECTION>__<KEY>`, values parsed as numbers or booleans
    /// where possible.
    fn environment() -> Environment {
        Environment::with_prefix("PREDICTOR")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_environment<P: AsRef<Path>>(path: P, environment: Environment) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment)
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.nats.url, "nats://localhost:4222");
        assert_eq!(config.nats.request_subject, "listings.predict");
        assert_eq!(config.scoring.price.floor, 10.0);
        assert_eq!(config.scoring.demand.manhattan_bonus, 15.0);
        assert_eq!(config.pipeline.workers, 4);
        assert!(config.scoring.seed.is_none());
    }

    #[test]
    fn test_tiers() {
        let demand = DemandScoringConfig::default();

        assert_eq!(demand.availability.bonus_below(0.1), 30.0);
        assert_eq!(demand.availability.bonus_below(0.3), 15.0);
        assert_eq!(demand.availability.bonus_below(0.6), 0.0);
        assert_eq!(demand.reviews.bonus_above(51.0), 20.0);
        assert_eq!(demand.reviews.bonus_above(30.0), 10.0);
        assert_eq!(demand.reviews.bonus_above(10.0), 0.0);
    }

    #[test]
    fn test_load_partial_file() {
        let path = std::env::temp_dir().join(format!(
            "listing-predictor-config-{}.toml",
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[nats]
url = "nats://broker:4222"

[scoring]
seed = 42

[scoring.price]
floor = 25.0

[scoring.demand.reviews]
strong = {{ threshold = 100.0, bonus = 25.0 }}
mild = {{ threshold = 20.0, bonus = 5.0 }}
"#
        )
        .unwrap();

        let config = AppConfig::load_from_path(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.nats.url, "nats://broker:4222");
        assert_eq!(config.nats.request_subject, "listings.predict");
        assert_eq!(config.scoring.seed, Some(42));
        assert_eq!(config.scoring.price.floor, 25.0);
        assert_eq!(config.scoring.price.base_rate, 100.0);
        assert_eq!(config.scoring.demand.reviews.strong.bonus, 25.0);
        assert_eq!(config.scoring.demand.manhattan_bonus, 15.0);
    }

    #[test]
    fn test_environment_overrides_file() {
        let vars: config::Map<String, String> = [
            ("PREDICTOR_NATS__URL", "nats://override:4222"),
            ("PREDICTOR_SCORING__SEED", "7"),
            ("PREDICTOR_SCORING__PRICE__FLOOR", "12.5"),
            ("PREDICTOR__PIPELINE__WORKERS", "99"),
            ("OTHER_NATS__URL", "nats://ignored:4222"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let config = AppConfig::load_with_environment(
            "config/config.toml",
            AppConfig::environment().source(Some(vars)),
        )
        .unwrap();

        assert_eq!(config.nats.url, "nats://override:4222");
        assert_eq!(config.scoring.seed, Some(7));
        assert_eq!(config.scoring.price.floor, 12.5);
        // Double separator after the prefix is not the documented form
        assert_eq!(config.pipeline.workers, 4);
        assert_eq!(config.nats.request_subject, "listings.predict");
    }

    #[test]
    fn test_builtin_frequencies() {
        let features = FeaturesConfig {
            neighbourhood_table: None,
            fallback_frequency: 0.02,
        };
        let frequencies = features.load_frequencies().unwrap();

        assert_eq!(frequencies.len(), 10);
        assert_eq!(frequencies.frequency("Williamsburg"), 0.078);
        assert_eq!(frequencies.frequency("Fordham"), 0.02);
    }
}
