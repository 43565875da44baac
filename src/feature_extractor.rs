//! Feature extraction for listing price and demand scoring.
//!
//! Turns raw listing attributes into a fixed-shape mapping of named numeric
//! features. Extraction is pure: the same listing always yields the same
//! mapping, and unrecognized categorical values degrade to fallback features
//! instead of failing.

use crate::types::listing::{NeighbourhoodGroup, RawListing, RoomType};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;

/// Feature names, in the column order a vectorized model consumes them.
pub mod names {
    pub const LATITUDE: &str = "latitude";
    pub const LONGITUDE: &str = "longitude";
    pub const MINIMUM_NIGHTS: &str = "minimum_nights";
    pub const NUMBER_OF_REVIEWS: &str = "number_of_reviews";
    pub const REVIEWS_PER_MONTH: &str = "reviews_per_month";
    pub const HOST_LISTINGS_COUNT: &str = "calculated_host_listings_count";
    pub const AVAILABILITY_365: &str = "availability_365";

    pub const AVAILABILITY_RATIO: &str = "availability_ratio";
    pub const REVIEWS_DENSITY: &str = "reviews_density";
    pub const MIN_NIGHTS_RATIO: &str = "min_nights_ratio";

    pub const ROOM_ENTIRE_HOME: &str = "room_type_Entire home/apt";
    pub const ROOM_PRIVATE: &str = "room_type_Private room";
    pub const ROOM_SHARED: &str = "room_type_Shared room";

    pub const GROUP_BRONX: &str = "neighbourhood_group_Bronx";
    pub const GROUP_BROOKLYN: &str = "neighbourhood_group_Brooklyn";
    pub const GROUP_MANHATTAN: &str = "neighbourhood_group_Manhattan";
    pub const GROUP_QUEENS: &str = "neighbourhood_group_Queens";
    pub const GROUP_STATEN_ISLAND: &str = "neighbourhood_group_Staten Island";

    pub const NEIGHBOURHOOD_ENCODED: &str = "neighbourhood_encoded";

    pub const ROOM_TYPE_GROUP: [&str; 3] = [ROOM_ENTIRE_HOME, ROOM_PRIVATE, ROOM_SHARED];

    pub const NEIGHBOURHOOD_GROUP_GROUP: [&str; 5] = [
        GROUP_BRONX,
        GROUP_BROOKLYN,
        GROUP_MANHATTAN,
        GROUP_QUEENS,
        GROUP_STATEN_ISLAND,
    ];

    pub const ALL: [&str; 19] = [
        // Passthrough numerics (7)
        LATITUDE,
        LONGITUDE,
        MINIMUM_NIGHTS,
        NUMBER_OF_REVIEWS,
        REVIEWS_PER_MONTH,
        HOST_LISTINGS_COUNT,
        AVAILABILITY_365,
        // Derived ratios (3)
        AVAILABILITY_RATIO,
        REVIEWS_DENSITY,
        MIN_NIGHTS_RATIO,
        // Room type one-hot (3)
        ROOM_ENTIRE_HOME,
        ROOM_PRIVATE,
        ROOM_SHARED,
        // Neighbourhood group one-hot (5)
        GROUP_BRONX,
        GROUP_BROOKLYN,
        GROUP_MANHATTAN,
        GROUP_QUEENS,
        GROUP_STATEN_ISLAND,
        // Frequency encoding (1)
        NEIGHBOURHOOD_ENCODED,
    ];
}

/// Named numeric features for one listing.
///
/// Ordered by name so iteration, serialization and any arithmetic folded
/// over the map are reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureMap(BTreeMap<String, f64>);

impl FeatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Value of a feature, 0.0 when absent
    pub fn value(&self, name: &str) -> f64 {
        self.get(name).unwrap_or(0.0)
    }

    /// True when the one-hot flag `name` is set
    pub fn flag(&self, name: &str) -> bool {
        self.value(name) >= 0.5
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Flatten into a vector following `columns`; missing columns are 0.0
    pub fn to_vector(&self, columns: &[&str]) -> Vec<f64> {
        columns.iter().map(|c| self.value(c)).collect()
    }
}

impl FromIterator<(String, f64)> for FeatureMap {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Frequency encoding table for neighbourhood names.
///
/// Reference data, not state: built once and injected into the extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeighbourhoodFrequencies {
    table: HashMap<String, f64>,
    fallback: f64,
}

impl NeighbourhoodFrequencies {
    pub const DEFAULT_FALLBACK: f64 = 0.01;

    pub fn new(table: HashMap<String, f64>, fallback: f64) -> Self {
        Self { table, fallback }
    }

    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Load a JSON object of `name -> frequency` from disk
    pub fn from_json_file<P: AsRef<Path>>(path: P, fallback: f64) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read neighbourhood table {}", path.display()))?;
        let table: HashMap<String, f64> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse neighbourhood table {}", path.display()))?;
        Ok(Self::new(table, fallback))
    }

    pub fn lookup(&self, neighbourhood: &str) -> Option<f64> {
        self.table.get(neighbourhood).copied()
    }

    /// Frequency for `neighbourhood`, or the fallback when unknown
    pub fn frequency(&self, neighbourhood: &str) -> f64 {
        self.lookup(neighbourhood).unwrap_or(self.fallback)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for NeighbourhoodFrequencies {
    fn default() -> Self {
        let table = [
            ("Harlem", 0.054),
            ("Williamsburg", 0.078),
            ("Upper West Side", 0.042),
            ("Bedford-Stuyvesant", 0.076),
            ("East Village", 0.035),
            ("Brooklyn Heights", 0.020),
            ("Astoria", 0.028),
            ("Bushwick", 0.047),
            ("Crown Heights", 0.031),
            ("Upper East Side", 0.034),
        ]
        .into_iter()
        .map(|(name, freq)| (name.to_string(), freq))
        .collect();

        Self::new(table, Self::DEFAULT_FALLBACK)
    }
}

/// A categorical value that fell back to default features.
///
/// A data-quality signal, never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DegradedFeature {
    RoomType(String),
    NeighbourhoodGroup(String),
    Neighbourhood(String),
}

impl DegradedFeature {
    pub fn field(&self) -> &'static str {
        match self {
            DegradedFeature::RoomType(_) => "room_type",
            DegradedFeature::NeighbourhoodGroup(_) => "neighbourhood_group",
            DegradedFeature::Neighbourhood(_) => "neighbourhood",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            DegradedFeature::RoomType(v)
            | DegradedFeature::NeighbourhoodGroup(v)
            | DegradedFeature::Neighbourhood(v) => v,
        }
    }
}

impl fmt::Display for DegradedFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized {} '{}'", self.field(), self.value())
    }
}

/// Feature extractor that transforms listings into model input features.
pub struct FeatureExtractor {
    frequencies: NeighbourhoodFrequencies,
}

impl FeatureExtractor {
    /// Create an extractor over the given neighbourhood table.
    pub fn new(frequencies: NeighbourhoodFrequencies) -> Self {
        Self { frequencies }
    }

    /// Extract features from a listing.
    ///
    /// Always returns every name in [`names::ALL`]. Ratios assume the listing
    /// passed validation; availability is not clamped here.
    pub fn extract(&self, listing: &RawListing) -> FeatureMap {
        let mut features = FeatureMap::new();

        let minimum_nights = listing.minimum_nights as f64;
        let number_of_reviews = listing.number_of_reviews as f64;
        let availability_365 = listing.availability_365 as f64;

        features.insert(names::LATITUDE, listing.latitude);
        features.insert(names::LONGITUDE, listing.longitude);
        features.insert(names::MINIMUM_NIGHTS, minimum_nights);
        features.insert(names::NUMBER_OF_REVIEWS, number_of_reviews);
        features.insert(names::REVIEWS_PER_MONTH, listing.reviews_per_month);
        features.insert(
            names::HOST_LISTINGS_COUNT,
            listing.calculated_host_listings_count as f64,
        );
        features.insert(names::AVAILABILITY_365, availability_365);

        features.insert(names::AVAILABILITY_RATIO, availability_365 / 365.0);
        let reviews_density = if listing.number_of_reviews > 0 {
            listing.reviews_per_month / number_of_reviews
        } else {
            0.0
        };
        features.insert(names::REVIEWS_DENSITY, reviews_density);
        features.insert(names::MIN_NIGHTS_RATIO, minimum_nights / 365.0);

        let active_room = match &listing.room_type {
            RoomType::EntireHome => Some(names::ROOM_ENTIRE_HOME),
            RoomType::PrivateRoom => Some(names::ROOM_PRIVATE),
            RoomType::SharedRoom => Some(names::ROOM_SHARED),
            RoomType::Unrecognized(_) => None,
        };
        for name in names::ROOM_TYPE_GROUP {
            features.insert(name, one_hot(Some(name) == active_room));
        }

        let active_group = match &listing.neighbourhood_group {
            NeighbourhoodGroup::Bronx => Some(names::GROUP_BRONX),
            NeighbourhoodGroup::Brooklyn => Some(names::GROUP_BROOKLYN),
            NeighbourhoodGroup::Manhattan => Some(names::GROUP_MANHATTAN),
            NeighbourhoodGroup::Queens => Some(names::GROUP_QUEENS),
            NeighbourhoodGroup::StatenIsland => Some(names::GROUP_STATEN_ISLAND),
            NeighbourhoodGroup::Unrecognized(_) => None,
        };
        for name in names::NEIGHBOURHOOD_GROUP_GROUP {
            features.insert(name, one_hot(Some(name) == active_group));
        }

        features.insert(
            names::NEIGHBOURHOOD_ENCODED,
            self.frequencies.frequency(&listing.neighbourhood),
        );

        features
    }

    /// Categorical values of `listing` that fell back to defaults
    pub fn degraded_features(&self, listing: &RawListing) -> Vec<DegradedFeature> {
        let mut degraded = Vec::new();

        if let RoomType::Unrecognized(raw) = &listing.room_type {
            degraded.push(DegradedFeature::RoomType(raw.clone()));
        }
        if let NeighbourhoodGroup::Unrecognized(raw) = &listing.neighbourhood_group {
            degraded.push(DegradedFeature::NeighbourhoodGroup(raw.clone()));
        }
        if self.frequencies.lookup(&listing.neighbourhood).is_none() {
            degraded.push(DegradedFeature::Neighbourhood(listing.neighbourhood.clone()));
        }

        degraded
    }

    /// Get the number of features produced.
    pub fn feature_count(&self) -> usize {
        names::ALL.len()
    }

    /// Get feature names in column order.
    pub fn feature_names(&self) -> &'static [&'static str] {
        &names::ALL
    }

    pub fn frequencies(&self) -> &NeighbourhoodFrequencies {
        &self.frequencies
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new(NeighbourhoodFrequencies::default())
    }
}

fn one_hot(active: bool) -> f64 {
    if active {
        1.0
    } else {
        0.0
    }
}
