//! Heuristic price and demand scorers.
//!
//! Stand-ins for trained models: a weighted linear price with a distance
//! penalty, and a tiered demand score. Both draw their noise from the caller's
//! [`NoiseSource`] and clamp their outputs into the published ranges.

use crate::config::{DemandScoringConfig, PriceScoringConfig};
use crate::feature_extractor::{names, FeatureMap};
use crate::models::aggregator::LinearCombiner;
use crate::models::inference::PredictionModel;
use crate::models::noise::NoiseSource;
use crate::types::listing::PredictionKind;
use crate::types::prediction::{DemandClass, PredictionOutcome};
use tracing::trace;

pub const PROBABILITY_MIN: f64 = 0.01;
pub const PROBABILITY_MAX: f64 = 0.99;

/// Regression-style price scorer
pub struct HeuristicPriceModel {
    params: PriceScoringConfig,
    linear: LinearCombiner,
}

impl HeuristicPriceModel {
    pub fn new(params: PriceScoringConfig) -> Self {
        let linear = LinearCombiner::intercept_only(params.base_rate)
            .with_weight(names::ROOM_ENTIRE_HOME, params.entire_home_offset)
            .with_weight(names::ROOM_PRIVATE, params.private_room_offset)
            .with_weight(names::GROUP_MANHATTAN, params.manhattan_offset)
            .with_weight(names::GROUP_BROOKLYN, params.brooklyn_offset)
            .with_weight(names::NEIGHBOURHOOD_ENCODED, params.neighbourhood_scale)
            .with_weight(names::NUMBER_OF_REVIEWS, params.reviews_coefficient)
            .with_weight(names::REVIEWS_PER_MONTH, params.reviews_per_month_coefficient)
            .with_weight(names::AVAILABILITY_365, -params.availability_penalty);

        Self { params, linear }
    }

    /// Euclidean distance in degree space from the reference point
    pub fn distance_from_reference(&self, features: &FeatureMap) -> f64 {
        let d_lat = features.value(names::LATITUDE) - self.params.reference_latitude;
        let d_lon = features.value(names::LONGITUDE) - self.params.reference_longitude;
        (d_lat * d_lat + d_lon * d_lon).sqrt()
    }

    /// Price before noise: linear terms, distance penalty, floor
    pub fn base_price(&self, features: &FeatureMap) -> f64 {
        let price = self.linear.combine(features)
            - self.params.distance_penalty * self.distance_from_reference(features);
        price.max(self.params.floor)
    }

    pub fn params(&self) -> &PriceScoringConfig {
        &self.params
    }
}

impl PredictionModel for HeuristicPriceModel {
    fn name(&self) -> &str {
        "heuristic_price"
    }

    fn kind(&self) -> PredictionKind {
        PredictionKind::Price
    }

    fn predict(&self, features: &FeatureMap, noise: &mut dyn NoiseSource) -> PredictionOutcome {
        let base = self.base_price(features);

        // Noise can cross the floor, so it is re-applied afterwards.
        let price = (base + noise.symmetric(self.params.noise_band)).max(self.params.floor);
        let confidence = (self.params.confidence_base
            + noise.symmetric(self.params.confidence_jitter))
        .clamp(0.0, 1.0);

        trace!(
            base_price = base,
            price = price,
            contributions = ?self.linear.top_contributors(features, 3),
            "Price scored"
        );

        PredictionOutcome::Price {
            predicted_price: round_to(price, 2).max(self.params.floor),
            confidence: round_to(confidence, 4),
        }
    }
}

/// Classification-style demand scorer
pub struct HeuristicDemandModel {
    params: DemandScoringConfig,
}

impl HeuristicDemandModel {
    pub fn new(params: DemandScoringConfig) -> Self {
        Self { params }
    }

    /// Score before noise, on a nominal 0-100 scale
    pub fn base_score(&self, features: &FeatureMap) -> f64 {
        let mut score = 0.0;

        score += self
            .params
            .availability
            .bonus_below(features.value(names::AVAILABILITY_RATIO));
        score += self
            .params
            .reviews
            .bonus_above(features.value(names::NUMBER_OF_REVIEWS));
        score += self
            .params
            .reviews_per_month
            .bonus_above(features.value(names::REVIEWS_PER_MONTH));

        if features.flag(names::GROUP_MANHATTAN) {
            score += self.params.manhattan_bonus;
        }
        if features.flag(names::ROOM_ENTIRE_HOME) {
            score += self.params.entire_home_bonus;
        }

        score
    }

    pub fn params(&self) -> &DemandScoringConfig {
        &self.params
    }
}

impl PredictionModel for HeuristicDemandModel {
    fn name(&self) -> &str {
        "heuristic_demand"
    }

    fn kind(&self) -> PredictionKind {
        PredictionKind::Demand
    }

    fn predict(&self, features: &FeatureMap, noise: &mut dyn NoiseSource) -> PredictionOutcome {
        let score = self.base_score(features) + noise.symmetric(self.params.noise_band);

        let probability = if score.is_nan() {
            PROBABILITY_MIN
        } else {
            (score / 100.0).clamp(PROBABILITY_MIN, PROBABILITY_MAX)
        };
        let probability = round_to(probability, 4);

        trace!(score = score, probability = probability, "Demand scored");

        PredictionOutcome::Demand {
            predicted_class: DemandClass::from_probability(probability),
            probability,
        }
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature_extractor::tests::arb_listing;
    use crate::feature_extractor::FeatureExtractor;
    use crate::models::noise::{FixedNoise, RngNoise};
    use crate::types::listing::{NeighbourhoodGroup, RawListing, RoomType};
    use proptest::prelude::*;

    fn harlem_features() -> FeatureMap {
        let mut listing =
            RawListing::new(RoomType::EntireHome, NeighbourhoodGroup::Manhattan, "Harlem");
        listing.number_of_reviews = 30;
        listing.reviews_per_month = 2.5;
        listing.availability_365 = 100;
        FeatureExtractor::default().extract(&listing)
    }

    #[test]
    fn test_price_example_without_noise() {
        let model = HeuristicPriceModel::new(PriceScoringConfig::default());
        let outcome = model.predict(&harlem_features(), &mut FixedNoise::midpoint());

        // 100 + 80 + 60 + 0.054*500 + 30*0.5 + 2.5*10 - 100*0.05 - 0
        assert_eq!(
            outcome,
            PredictionOutcome::Price {
                predicted_price: 302.0,
                confidence: 0.85,
            }
        );
    }

    #[test]
    fn test_price_noise_band() {
        let model = HeuristicPriceModel::new(PriceScoringConfig::default());
        let features = harlem_features();

        let high = model.predict(&features, &mut FixedNoise::high());
        let low = model.predict(&features, &mut FixedNoise::low());

        assert_eq!(
            high,
            PredictionOutcome::Price {
                predicted_price: 322.0,
                confidence: 0.95,
            }
        );
        assert_eq!(
            low,
            PredictionOutcome::Price {
                predicted_price: 282.0,
                confidence: 0.75,
            }
        );
    }

    #[test]
    fn test_distance_penalty_lowers_price() {
        let model = HeuristicPriceModel::new(PriceScoringConfig::default());
        let mut listing =
            RawListing::new(RoomType::EntireHome, NeighbourhoodGroup::Manhattan, "Harlem");
        let central = model.base_price(&FeatureExtractor::default().extract(&listing));

        listing.latitude += 0.1;
        let north = model.base_price(&FeatureExtractor::default().extract(&listing));

        assert!((central - north - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_features_hit_floor() {
        let model = HeuristicPriceModel::new(PriceScoringConfig::default());
        let outcome = model.predict(&FeatureMap::new(), &mut FixedNoise::low());

        match outcome {
            PredictionOutcome::Price {
                predicted_price,
                confidence,
            } => {
                assert_eq!(predicted_price, 10.0);
                assert_eq!(confidence, 0.75);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_demand_example_without_noise() {
        let model = HeuristicDemandModel::new(DemandScoringConfig::default());
        let features = harlem_features();

        // 30 (availability) + 10 (reviews) + 20 (reviews/month) + 15 + 10
        assert_eq!(model.base_score(&features), 85.0);
        assert_eq!(
            model.predict(&features, &mut FixedNoise::midpoint()),
            PredictionOutcome::Demand {
                predicted_class: DemandClass::HighDemand,
                probability: 0.85,
            }
        );
    }

    #[test]
    fn test_demand_degenerate_features() {
        let model = HeuristicDemandModel::new(DemandScoringConfig::default());

        // availability_ratio 0 still earns the strongest availability tier
        assert_eq!(model.base_score(&FeatureMap::new()), 30.0);
        assert_eq!(
            model.predict(&FeatureMap::new(), &mut FixedNoise::low()),
            PredictionOutcome::Demand {
                predicted_class: DemandClass::LowDemand,
                probability: 0.25,
            }
        );
    }

    #[test]
    fn test_demand_probability_clamped() {
        let mut params = DemandScoringConfig::default();
        params.manhattan_bonus = 500.0;
        let model = HeuristicDemandModel::new(params);

        match model.predict(&harlem_features(), &mut FixedNoise::high()) {
            PredictionOutcome::Demand { probability, .. } => assert_eq!(probability, 0.99),
            other => panic!("unexpected outcome {:?}", other),
        }

        let mut params = DemandScoringConfig::default();
        params.availability.strong.bonus = -500.0;
        let model = HeuristicDemandModel::new(params);

        match model.predict(&FeatureMap::new(), &mut FixedNoise::low()) {
            PredictionOutcome::Demand {
                probability,
                predicted_class,
            } => {
                assert_eq!(probability, 0.01);
                assert_eq!(predicted_class, DemandClass::LowDemand);
            }
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(302.004999, 2), 302.0);
        assert_eq!(round_to(0.123456, 4), 0.1235);
        assert_eq!(round_to(10.0, 2), 10.0);
    }

    proptest! {
        #[test]
        fn prop_price_never_below_floor(listing in arb_listing(), seed in any::<u64>()) {
            let model = HeuristicPriceModel::new(PriceScoringConfig::default());
            let features = FeatureExtractor::default().extract(&listing);

            match model.predict(&features, &mut RngNoise::seeded(seed)) {
                PredictionOutcome::Price { predicted_price, confidence } => {
                    prop_assert!(predicted_price >= 10.0);
                    prop_assert!((0.0..=1.0).contains(&confidence));
                }
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }

        #[test]
        fn prop_demand_probability_bounded(listing in arb_listing(), seed in any::<u64>()) {
            let model = HeuristicDemandModel::new(DemandScoringConfig::default());
            let features = FeatureExtractor::default().extract(&listing);

            match model.predict(&features, &mut RngNoise::seeded(seed)) {
                PredictionOutcome::Demand { predicted_class, probability } => {
                    prop_assert!((PROBABILITY_MIN..=PROBABILITY_MAX).contains(&probability));
                    prop_assert_eq!(predicted_class == DemandClass::HighDemand, probability > 0.5);
                }
                other => prop_assert!(false, "unexpected outcome {:?}", other),
            }
        }
    }
}
