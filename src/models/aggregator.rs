//! Weighted linear combination over a feature mapping

use crate::feature_extractor::FeatureMap;
use std::collections::BTreeMap;

/// Combines named features into a single score: `intercept + Σ weight·value`.
///
/// Features without a weight do not contribute; weighted features missing
/// from the mapping count as 0. Terms are summed in name order so the result
/// is bit-for-bit reproducible.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearCombiner {
    intercept: f64,
    weights: BTreeMap<String, f64>,
}

impl LinearCombiner {
    /// Create a combiner with an intercept and per-feature weights.
    pub fn new(intercept: f64, weights: BTreeMap<String, f64>) -> Self {
        Self { intercept, weights }
    }

    /// Create a combiner with only an intercept.
    pub fn intercept_only(intercept: f64) -> Self {
        Self::new(intercept, BTreeMap::new())
    }

    /// Builder-style weight assignment. Zero weights are dropped.
    pub fn with_weight(mut self, feature: &str, weight: f64) -> Self {
        self.set_weight(feature, weight);
        self
    }

    /// Set weight for a specific feature.
    pub fn set_weight(&mut self, feature: &str, weight: f64) {
        if weight == 0.0 {
            self.weights.remove(feature);
        } else {
            self.weights.insert(feature.to_string(), weight);
        }
    }

    /// Combine the weighted features into a score.
    pub fn combine(&self, features: &FeatureMap) -> f64 {
        self.weights
            .iter()
            .fold(self.intercept, |acc, (name, weight)| {
                acc + weight * features.value(name)
            })
    }

    /// Per-feature contribution to the score, excluding the intercept.
    pub fn contributions(&self, features: &FeatureMap) -> BTreeMap<String, f64> {
        self.weights
            .iter()
            .map(|(name, weight)| (name.clone(), weight * features.value(name)))
            .collect()
    }

    /// Features with the largest absolute contribution, strongest first.
    pub fn top_contributors(&self, features: &FeatureMap, n: usize) -> Vec<(String, f64)> {
        let mut contributions: Vec<(String, f64)> =
            self.contributions(features).into_iter().collect();
        contributions.sort_by(|a, b| b.1.abs().total_cmp(&a.1.abs()));
        contributions.truncate(n);
        contributions
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Get configured weights.
    pub fn get_weights(&self) -> &BTreeMap<String, f64> {
        &self.weights
    }
}
