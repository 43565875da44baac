//! End-to-end prediction flow through the public library surface

use listing_predictor::config::AppConfig;
use listing_predictor::feature_extractor::names;
use listing_predictor::models::{FixedNoise, MetadataLoader, RngNoise};
use listing_predictor::types::{DemandClass, ModelRegistry};
use listing_predictor::{
    FeatureExtractor, InMemoryRecorder, InferenceEngine, NeighbourhoodFrequencies,
    PredictionResult, PredictionService,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

fn service_with(config: &AppConfig, extractor: FeatureExtractor) -> PredictionService<InMemoryRecorder> {
    PredictionService::new(
        extractor,
        InferenceEngine::new(config, ModelRegistry::default()),
        InMemoryRecorder::new(),
        Arc::new(Default::default()),
        Duration::from_millis(config.pipeline.record_timeout_ms),
    )
}

fn harlem(prediction_type: &str) -> Value {
    json!({
        "prediction_type": prediction_type,
        "room_type": "Entire home/apt",
        "neighbourhood_group": "Manhattan",
        "neighbourhood": "Harlem",
        "minimum_nights": 1,
        "number_of_reviews": 30,
        "reviews_per_month": 2.5,
        "calculated_host_listings_count": 1,
        "availability_365": 100,
        "latitude": 40.7580,
        "longitude": -73.9855
    })
}

async fn reply(service: &PredictionService<InMemoryRecorder>, request: &Value) -> Value {
    let payload = serde_json::to_vec(request).unwrap();
    let bytes = service
        .handle_payload(&payload, &mut FixedNoise::midpoint())
        .await;
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_harlem_price_and_demand() {
    let service = service_with(&AppConfig::default(), FeatureExtractor::default());

    let price = reply(&service, &harlem("price")).await;
    assert_eq!(price["prediction_type"], "price");
    assert_eq!(price["predicted_price"], 302.0);
    assert_eq!(price["confidence"], 0.85);
    assert_eq!(price["model_version"], "RandomForestRegressor-v1.0");

    let demand = reply(&service, &harlem("demand")).await;
    assert_eq!(demand["prediction_type"], "demand");
    assert_eq!(demand["predicted_class"], "high-demand");
    assert_eq!(demand["probability"], 0.85);
    assert_eq!(demand["model_version"], "LightGBMClassifier-v1.0");

    let records = service.recorder().records();
    assert_eq!(records.len(), 2);
    assert_eq!(price["prediction_id"], records[0].0.as_str());
    assert_eq!(demand["prediction_id"], records[1].0.as_str());
    assert_eq!(records[1].1.predicted_class, Some(DemandClass::HighDemand));

    let features = &records[0].1.input_features;
    assert_eq!(features.value(names::NEIGHBOURHOOD_ENCODED), 0.054);
    assert_eq!(features.value(names::ROOM_ENTIRE_HOME), 1.0);
    assert_eq!(features.value(names::GROUP_MANHATTAN), 1.0);
}

#[tokio::test]
async fn test_result_round_trip() {
    let service = service_with(&AppConfig::default(), FeatureExtractor::default());

    for kind in ["price", "demand"] {
        let body = reply(&service, &harlem(kind)).await;
        let result: PredictionResult = serde_json::from_value(body.clone()).unwrap();

        assert!(result.prediction_id.is_some());
        assert_eq!(serde_json::to_value(&result).unwrap(), body);
    }
}

#[tokio::test]
async fn test_rejected_requests_carry_only_an_error() {
    let service = service_with(&AppConfig::default(), FeatureExtractor::default());

    let mut negative = harlem("price");
    negative["number_of_reviews"] = json!(-3);
    let mut out_of_range = harlem("demand");
    out_of_range["availability_365"] = json!(366);
    let mut missing = harlem("price");
    missing.as_object_mut().unwrap().remove("room_type");

    for request in [harlem("forecast"), negative, out_of_range, missing] {
        let body = reply(&service, &request).await;
        let object = body.as_object().unwrap();

        assert_eq!(object.len(), 1, "unexpected reply {}", body);
        assert!(object["error"].is_string());
    }

    assert!(service.recorder().is_empty());
    assert_eq!(
        service
            .metrics()
            .invalid_requests
            .load(std::sync::atomic::Ordering::Relaxed),
        4
    );
}

#[tokio::test]
async fn test_unknown_neighbourhood_degrades_gracefully() {
    let service = service_with(&AppConfig::default(), FeatureExtractor::default());

    let mut request = harlem("price");
    request["neighbourhood"] = json!("Mott Haven");
    request["neighbourhood_group"] = json!("Bronx");
    request["room_type"] = json!("Hotel room");

    let body = reply(&service, &request).await;
    assert!(body.get("error").is_none());

    // 100 + 0 (room) + 0 (group) + 0.01*500 + 15 + 25 - 5
    assert_eq!(body["predicted_price"], 140.0);

    let record = &service.recorder().records()[0].1;
    assert_eq!(record.input_features.value(names::GROUP_BRONX), 1.0);
    assert_eq!(record.input_features.value(names::NEIGHBOURHOOD_ENCODED), 0.01);
}

#[tokio::test]
async fn test_injected_frequency_table() {
    let path = std::env::temp_dir().join(format!(
        "listing-predictor-neighbourhoods-{}.json",
        std::process::id()
    ));
    std::fs::write(&path, r#"{"Harlem": 0.1, "Fordham": 0.03}"#).unwrap();
    let frequencies = NeighbourhoodFrequencies::from_json_file(&path, 0.0).unwrap();
    std::fs::remove_file(&path).ok();

    let service = service_with(&AppConfig::default(), FeatureExtractor::new(frequencies));
    let body = reply(&service, &harlem("price")).await;

    // 0.046 more frequency encoding at a scale of 500
    assert_eq!(body["predicted_price"], 325.0);
}

#[tokio::test]
async fn test_seeded_noise_reproducible() {
    let service = service_with(&AppConfig::default(), FeatureExtractor::default());
    let payload = serde_json::to_vec(&harlem("price")).unwrap();

    let first = service
        .handle_payload(&payload, &mut RngNoise::seeded(7))
        .await;
    let second = service
        .handle_payload(&payload, &mut RngNoise::seeded(7))
        .await;

    let strip_id = |bytes: &[u8]| {
        let mut value: Value = serde_json::from_slice(bytes).unwrap();
        value.as_object_mut().unwrap().remove("prediction_id");
        value
    };
    assert_eq!(strip_id(&first), strip_id(&second));

    let price = strip_id(&first)["predicted_price"].as_f64().unwrap();
    assert!((282.0..=322.0).contains(&price));
}

#[test]
fn test_shipped_config_matches_defaults() {
    let config = AppConfig::load_from_path("config/config.toml").unwrap();
    let defaults = AppConfig::default();

    assert_eq!(config.scoring.price, defaults.scoring.price);
    assert_eq!(config.scoring.demand, defaults.scoring.demand);
    assert_eq!(config.nats.request_subject, defaults.nats.request_subject);
    assert_eq!(config.models.metadata_path, "config/metadata.json");
}

#[test]
fn test_shipped_metadata_registry() {
    let registry = MetadataLoader::load_registry("config/metadata.json").unwrap();
    let engine = InferenceEngine::new(&AppConfig::default(), registry);

    assert_eq!(
        engine.model_version(listing_predictor::PredictionKind::Price),
        "RandomForestRegressor-v1.0"
    );
    assert_eq!(
        engine.model_version(listing_predictor::PredictionKind::Demand),
        "LightGBMClassifier-v1.0"
    );
}
