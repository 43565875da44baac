//! Test Listing Producer
//!
//! Sends randomized price and demand prediction requests to the predictor
//! over NATS request/reply and logs the replies.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

/// Request structure matching the predictor's expected format
#[derive(Debug, Clone, Serialize)]
struct ListingRequest {
    prediction_type: &'static str,
    latitude: f64,
    longitude: f64,
    room_type: &'static str,
    neighbourhood_group: &'static str,
    neighbourhood: &'static str,
    minimum_nights: i64,
    number_of_reviews: i64,
    reviews_per_month: f64,
    calculated_host_listings_count: i64,
    availability_365: i64,
}

const NEIGHBOURHOODS: &[(&str, &str, f64, f64)] = &[
    ("Manhattan", "Harlem", 40.8116, -73.9465),
    ("Manhattan", "Upper West Side", 40.7870, -73.9754),
    ("Manhattan", "East Village", 40.7265, -73.9815),
    ("Manhattan", "Upper East Side", 40.7736, -73.9566),
    ("Brooklyn", "Williamsburg", 40.7081, -73.9571),
    ("Brooklyn", "Bedford-Stuyvesant", 40.6872, -73.9418),
    ("Brooklyn", "Brooklyn Heights", 40.6960, -73.9936),
    ("Brooklyn", "Bushwick", 40.6944, -73.9213),
    ("Brooklyn", "Crown Heights", 40.6681, -73.9448),
    ("Queens", "Astoria", 40.7644, -73.9235),
    ("Bronx", "Mott Haven", 40.8091, -73.9229),
    ("Staten Island", "St. George", 40.6437, -74.0736),
];

const ROOM_TYPES: &[&str] = &["Entire home/apt", "Private room", "Shared room"];

/// Listing generator for load testing
struct ListingGenerator {
    rng: rand::rngs::ThreadRng,
}

impl ListingGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Generate a plausible listing near its neighbourhood's centre
    fn generate(&mut self, demand_rate: f64) -> ListingRequest {
        let (group, neighbourhood, lat, lon) =
            NEIGHBOURHOODS[self.rng.gen_range(0..NEIGHBOURHOODS.len())];
        let number_of_reviews = self.rng.gen_range(0..300);

        ListingRequest {
            prediction_type: if self.rng.gen_bool(demand_rate) {
                "demand"
            } else {
                "price"
            },
            latitude: lat + self.rng.gen_range(-0.01..0.01),
            longitude: lon + self.rng.gen_range(-0.01..0.01),
            room_type: ROOM_TYPES[self.rng.gen_range(0..ROOM_TYPES.len())],
            neighbourhood_group: group,
            neighbourhood,
            minimum_nights: self.rng.gen_range(1..31),
            number_of_reviews,
            reviews_per_month: if number_of_reviews == 0 {
                0.0
            } else {
                (self.rng.gen_range(0.0..6.0_f64) * 100.0).round() / 100.0
            },
            calculated_host_listings_count: self.rng.gen_range(1..20),
            availability_365: self.rng.gen_range(0..366),
        }
    }
}

/// A reply from the predictor, as seen by the load generator
#[derive(Debug)]
enum Reply {
    Prediction(serde_json::Value),
    Rejected(serde_json::Value),
    Malformed(serde_json::Error),
}

fn classify_reply(payload: &[u8]) -> Reply {
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(body) if body.get("error").is_some() => Reply::Rejected(body),
        Ok(body) => Reply::Prediction(body),
        Err(e) => Reply::Malformed(e),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Listing Producer");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("listings.predict");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let demand_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.5);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        demand_rate = demand_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, demand_rate, delay_ms).await;
        }
    };

    let mut generator = ListingGenerator::new();
    let mut answered = 0u64;
    let mut failed = 0u64;

    info!("Starting to send {} prediction requests...", count);

    for i in 0..count {
        let listing = generator.generate(demand_rate);
        let payload = serde_json::to_vec(&listing)?;

        match client.request(subject.to_string(), payload.into()).await {
            Ok(reply) => match classify_reply(&reply.payload) {
                Reply::Prediction(body) => {
                    answered += 1;
                    info!(
                        kind = listing.prediction_type,
                        neighbourhood = listing.neighbourhood,
                        room_type = listing.room_type,
                        reply = %body,
                        "Prediction received"
                    );
                }
                Reply::Rejected(body) => {
                    answered += 1;
                    warn!(neighbourhood = listing.neighbourhood, reply = %body, "Prediction rejected");
                }
                Reply::Malformed(e) => {
                    failed += 1;
                    warn!(error = %e, bytes = reply.payload.len(), "Reply is not valid JSON");
                }
            },
            Err(e) => {
                failed += 1;
                warn!(error = %e, "Prediction request failed");
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} answered, {} failed)",
                i + 1,
                count,
                answered,
                failed
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} answered, {} failed)",
        count, answered, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, demand_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ListingGenerator::new();

    for i in 0..count {
        let listing = generator.generate(demand_rate);
        let json = serde_json::to_string_pretty(&listing)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reply() {
        assert!(matches!(
            classify_reply(br#"{"prediction_type":"price","predicted_price":120.0}"#),
            Reply::Prediction(_)
        ));
        assert!(matches!(
            classify_reply(br#"{"error":"Invalid request: availability_365 must be within 0-365"}"#),
            Reply::Rejected(_)
        ));
        assert!(matches!(classify_reply(b"503 no responders"), Reply::Malformed(_)));
        assert!(matches!(classify_reply(b""), Reply::Malformed(_)));
    }

    #[test]
    fn test_generated_listings_are_valid_requests() {
        let mut generator = ListingGenerator::new();

        for _ in 0..200 {
            let listing = generator.generate(0.5);
            assert!((1..=30).contains(&listing.minimum_nights));
            assert!((0..=365).contains(&listing.availability_365));
            assert!(listing.reviews_per_month >= 0.0);
            if listing.number_of_reviews == 0 {
                assert_eq!(listing.reviews_per_month, 0.0);
            }
        }
    }
}
