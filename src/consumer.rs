//! NATS subscriptions for prediction and metadata requests

use crate::config::NatsConfig;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for request/reply traffic addressed to the predictor
pub struct RequestConsumer {
    client: Client,
    request_subject: String,
    metadata_subject: String,
    health_subject: String,
    queue_group: Option<String>,
}

impl RequestConsumer {
    pub fn new(client: Client, config: &NatsConfig) -> Self {
        Self {
            client,
            request_subject: config.request_subject.clone(),
            metadata_subject: config.metadata_subject.clone(),
            health_subject: config.health_subject.clone(),
            queue_group: config.queue_group.clone(),
        }
    }

    /// Subscribe to prediction requests.
    ///
    /// With a queue group configured, replicas share the request load.
    pub async fn subscribe_requests(&self) -> Result<Subscriber> {
        let subscriber = self.subscribe(&self.request_subject).await?;
        info!(
            subject = %self.request_subject,
            queue_group = ?self.queue_group,
            "Subscribed to prediction requests"
        );
        Ok(subscriber)
    }

    /// Subscribe to model metadata requests
    pub async fn subscribe_metadata(&self) -> Result<Subscriber> {
        let subscriber = self.subscribe(&self.metadata_subject).await?;
        info!(subject = %self.metadata_subject, "Subscribed to metadata requests");
        Ok(subscriber)
    }

    /// Subscribe to health checks
    pub async fn subscribe_health(&self) -> Result<Subscriber> {
        let subscriber = self.subscribe(&self.health_subject).await?;
        info!(subject = %self.health_subject, "Subscribed to health checks");
        Ok(subscriber)
    }

    async fn subscribe(&self, subject: &str) -> Result<Subscriber> {
        let subscriber = match &self.queue_group {
            Some(group) => {
                self.client
                    .queue_subscribe(subject.to_string(), group.clone())
                    .await
            }
            None => self.client.subscribe(subject.to_string()).await,
        };
        subscriber.with_context(|| format!("Failed to subscribe to '{}'", subject))
    }

    pub fn request_subject(&self) -> &str {
        &self.request_subject
    }

    pub fn metadata_subject(&self) -> &str {
        &self.metadata_subject
    }

    pub fn health_subject(&self) -> &str {
        &self.health_subject
    }
}
