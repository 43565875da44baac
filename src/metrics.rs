//! Performance metrics and statistics tracking for the prediction service.

use crate::types::prediction::{DemandClass, PredictionOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for the prediction pipeline
pub struct PipelineMetrics {
    /// Successful price predictions
    pub price_predictions: AtomicU64,
    /// Successful demand predictions
    pub demand_predictions: AtomicU64,
    /// Demand predictions labelled high-demand
    pub high_demand: AtomicU64,
    /// Requests rejected before scoring
    pub invalid_requests: AtomicU64,
    /// Recorder errors and timeouts
    pub persistence_failures: AtomicU64,
    /// Fallbacks by categorical field
    degraded_by_field: RwLock<HashMap<String, u64>>,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Sum of predicted prices in cents
    price_cents_total: AtomicU64,
    /// Demand probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    /// Start time for rate calculation
    start_time: Instant,
}

impl PipelineMetrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            price_predictions: AtomicU64::new(0),
            demand_predictions: AtomicU64::new(0),
            high_demand: AtomicU64::new(0),
            invalid_requests: AtomicU64::new(0),
            persistence_failures: AtomicU64::new(0),
            degraded_by_field: RwLock::new(HashMap::new()),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            price_cents_total: AtomicU64::new(0),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful prediction
    pub fn record_prediction(&self, outcome: &PredictionOutcome, processing_time: Duration) {
        match outcome {
            PredictionOutcome::Price {
                predicted_price, ..
            } => {
                self.price_predictions.fetch_add(1, Ordering::Relaxed);
                let cents = (predicted_price * 100.0).round().max(0.0) as u64;
                self.price_cents_total.fetch_add(cents, Ordering::Relaxed);
            }
            PredictionOutcome::Demand {
                predicted_class,
                probability,
            } => {
                self.demand_predictions.fetch_add(1, Ordering::Relaxed);
                if *predicted_class == DemandClass::HighDemand {
                    self.high_demand.fetch_add(1, Ordering::Relaxed);
                }
                let bucket = (probability * 10.0).clamp(0.0, 9.0) as usize;
                if let Ok(mut buckets) = self.probability_buckets.write() {
                    buckets[bucket] += 1;
                }
            }
        }

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only last 10000 for memory efficiency
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record a request rejected by validation
    pub fn record_invalid(&self) {
        self.invalid_requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a categorical fallback for `field`
    pub fn record_degraded(&self, field: &str) {
        if let Ok(mut by_field) = self.degraded_by_field.write() {
            *by_field.entry(field.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a recorder error or timeout
    pub fn record_persistence_failure(&self) {
        self.persistence_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Total successful predictions
    pub fn predictions(&self) -> u64 {
        self.price_predictions.load(Ordering::Relaxed)
            + self.demand_predictions.load(Ordering::Relaxed)
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted: Vec<u64> = match self.processing_times.read() {
            Ok(times) => times.clone(),
            Err(_) => return ProcessingStats::default(),
        };
        if sorted.is_empty() {
            return ProcessingStats::default();
        }
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.50),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Mean predicted price, 0 when no price predictions were made
    pub fn get_mean_price(&self) -> f64 {
        let count = self.price_predictions.load(Ordering::Relaxed);
        if count == 0 {
            return 0.0;
        }
        self.price_cents_total.load(Ordering::Relaxed) as f64 / 100.0 / count as f64
    }

    /// Share of demand predictions labelled high-demand
    pub fn get_high_demand_rate(&self) -> f64 {
        let demand = self.demand_predictions.load(Ordering::Relaxed);
        if demand == 0 {
            return 0.0;
        }
        self.high_demand.load(Ordering::Relaxed) as f64 / demand as f64
    }

    /// Get current throughput (predictions per second)
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.predictions() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Get demand probability distribution
    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Get categorical fallbacks by field
    pub fn get_degraded_by_field(&self) -> HashMap<String, u64> {
        self.degraded_by_field
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        let processing = self.get_processing_stats();
        let degraded = self.get_degraded_by_field();
        let distribution = self.get_probability_distribution();

        info!("==================== PREDICTION METRICS ====================");
        info!(
            "Predictions: {} price, {} demand ({:.1} req/s)",
            self.price_predictions.load(Ordering::Relaxed),
            self.demand_predictions.load(Ordering::Relaxed),
            self.get_throughput()
        );
        info!(
            "Mean price: ${:.2} | High demand rate: {:.1}%",
            self.get_mean_price(),
            self.get_high_demand_rate() * 100.0
        );
        info!(
            "Rejected: {} invalid | Persistence failures: {}",
            self.invalid_requests.load(Ordering::Relaxed),
            self.persistence_failures.load(Ordering::Relaxed)
        );
        info!(
            "Processing time (us): mean={} p50={} p95={} p99={} max={}",
            processing.mean_us,
            processing.p50_us,
            processing.p95_us,
            processing.p99_us,
            processing.max_us
        );
        for (field, count) in &degraded {
            info!("Degraded {}: {}", field, count);
        }

        let total: u64 = distribution.iter().sum();
        if total > 0 {
            info!("Demand probability distribution:");
            for (i, &count) in distribution.iter().enumerate() {
                let pct = (count as f64 / total as f64) * 100.0;
                let bar: String = "#".repeat(((pct / 2.0) as usize).min(20));
                info!(
                    "  {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                    i as f64 / 10.0,
                    (i + 1) as f64 / 10.0,
                    count,
                    pct,
                    bar
                );
            }
        }
        info!("============================================================");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Default)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Real-time metrics reporter that prints periodic summaries
pub struct MetricsReporter {
    metrics: Arc<PipelineMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<PipelineMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}
