//! Listing Predictor - Main Entry Point
//!
//! Answers price and demand prediction requests over NATS request/reply,
//! recording each prediction through the configured store subject.

use anyhow::{Context, Result};
use async_nats::Message;
use futures::StreamExt;
use listing_predictor::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    feature_extractor::FeatureExtractor,
    metrics::{MetricsReporter, PipelineMetrics},
    models::{InferenceEngine, MetadataLoader, RngNoise},
    recorder::NatsRecorder,
    service::{spawn_with_permit, PredictionService},
};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

type Service = PredictionService<NatsRecorder>;

fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(format!("listing_predictor={}", config.level).parse()?);

    if config.format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration before logging so the level and format apply
    let config = AppConfig::load()?;
    init_tracing(&config.logging)?;

    info!("Starting Listing Predictor");
    info!(
        "Price floor: {:.2}, noise band: ±{:.1} | Demand noise band: ±{:.1}",
        config.scoring.price.floor, config.scoring.price.noise_band, config.scoring.demand.noise_band
    );
    if let Some(seed) = config.scoring.seed {
        warn!(seed, "Fixed scoring seed configured, predictions are reproducible");
    }

    let metrics = Arc::new(PipelineMetrics::new());

    let frequencies = config.features.load_frequencies()?;
    let extractor = FeatureExtractor::new(frequencies);
    info!(
        "Feature extractor initialized ({} features, {} known neighbourhoods)",
        extractor.feature_count(),
        extractor.frequencies().len()
    );

    let registry = MetadataLoader::load_or_default(&config.models.metadata_path);
    let engine = InferenceEngine::new(&config, registry);
    info!(
        "Inference engine initialized with {} models: {:?}",
        engine.model_count(),
        engine.model_names()
    );

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let recorder = NatsRecorder::new(client.clone(), &config.nats.record_subject);
    info!("Recording predictions via: {}", recorder.subject());

    let service = Arc::new(PredictionService::new(
        extractor,
        engine,
        recorder,
        metrics.clone(),
        Duration::from_millis(config.pipeline.record_timeout_ms),
    ));

    let consumer = RequestConsumer::new(client.clone(), &config.nats);
    let mut requests = consumer.subscribe_requests().await?;
    let mut metadata_requests = consumer.subscribe_metadata().await?;
    let mut health_requests = consumer.subscribe_health().await?;

    let num_workers = config.pipeline.workers.max(1);
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));
    let seed = config.scoring.seed;

    // Start metrics reporter (prints summary every 30 seconds)
    let reporter = MetricsReporter::new(metrics.clone(), 30);
    tokio::spawn(reporter.start());

    loop {
        tokio::select! {
            message = requests.next() => {
                let Some(message) = message else {
                    warn!("Request subscription closed");
                    break;
                };

                let service = service.clone();
                let client = client.clone();
                let processed_count = processed_count.clone();

                spawn_with_permit(semaphore.clone(), async move {
                    handle_request(&service, &client, message, seed).await;

                    let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;

                    // Log progress every 100 requests
                    if count % 100 == 0 {
                        let stats = service.metrics().get_processing_stats();
                        info!(
                            processed = count,
                            throughput = format!("{:.1} req/s", service.metrics().get_throughput()),
                            avg_latency_us = stats.mean_us,
                            "Processing milestone"
                        );
                    }
                });
            }
            message = metadata_requests.next() => {
                let Some(message) = message else {
                    warn!("Metadata subscription closed");
                    break;
                };
                reply_json(&client, message, service.engine().registry(), "metadata").await;
            }
            message = health_requests.next() => {
                let Some(message) = message else {
                    warn!("Health subscription closed");
                    break;
                };
                reply_json(&client, message, &service.health(), "health").await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    info!("Predictor shutting down...");
    metrics.print_summary();

    Ok(())
}

async fn handle_request(service: &Service, client: &async_nats::Client, message: Message, seed: Option<u64>) {
    let Some(reply) = message.reply.clone() else {
        warn!(subject = %message.subject, "Prediction request without reply subject, dropping");
        return;
    };

    let mut noise = match seed {
        Some(seed) => RngNoise::seeded(seed),
        None => RngNoise::from_entropy(),
    };
    let response = service.handle_payload(&message.payload, &mut noise).await;

    if let Err(e) = client.publish(reply, response.into()).await {
        error!(error = %e, "Failed to publish prediction reply");
    } else {
        debug!("Prediction reply published");
    }
}

async fn reply_json<T: Serialize>(client: &async_nats::Client, message: Message, body: &T, what: &str) {
    let Some(reply) = message.reply else {
        warn!(subject = %message.subject, kind = what, "Request without reply subject, dropping");
        return;
    };

    match serde_json::to_vec(body) {
        Ok(payload) => {
            if let Err(e) = client.publish(reply, payload.into()).await {
                error!(error = %e, kind = what, "Failed to publish reply");
            }
        }
        Err(e) => error!(error = %e, kind = what, "Failed to encode reply"),
    }
}
