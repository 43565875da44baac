//! Prediction recorder collaborators
//!
//! The recorder persists a prediction and hands back a durable identifier.
//! Callers treat every recorder failure as non-fatal.

use crate::types::prediction::PredictionRecord;
use anyhow::{Context, Result};
use async_nats::Client;
use serde::Deserialize;
use std::future::Future;
use std::sync::Mutex;
use tracing::debug;

/// Persists prediction records
pub trait PredictionRecorder: Send + Sync {
    /// Store `record`, returning its durable identifier
    fn record(&self, record: &PredictionRecord) -> impl Future<Output = Result<String>> + Send;
}

/// Identifier in a store acknowledgement; stores may use numeric or text keys
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecordId {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
struct RecordAck {
    id: RecordId,
}

/// Recorder that sends records to a store service over NATS request/reply.
///
/// The store answers with `{"id": ...}`.
#[derive(Clone)]
pub struct NatsRecorder {
    client: Client,
    subject: String,
}

impl NatsRecorder {
    /// Create a new recorder
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

impl PredictionRecorder for NatsRecorder {
    async fn record(&self, record: &PredictionRecord) -> Result<String> {
        let payload = serde_json::to_vec(record)?;

        let reply = self
            .client
            .request(self.subject.clone(), payload.into())
            .await
            .with_context(|| format!("Recorder request on '{}' failed", self.subject))?;

        let ack: RecordAck = serde_json::from_slice(&reply.payload)
            .context("Recorder replied with an invalid acknowledgement")?;
        let id = match ack.id {
            RecordId::Text(id) => id,
            RecordId::Number(id) => id.to_string(),
        };

        debug!(
            prediction_id = %id,
            prediction_type = %record.prediction_type,
            "Prediction recorded"
        );

        Ok(id)
    }
}

/// Recorder that keeps records in memory, keyed by generated UUIDs
#[derive(Default)]
pub struct InMemoryRecorder {
    records: Mutex<Vec<(String, PredictionRecord)>>,
}

impl InMemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored records, oldest first
    pub fn records(&self) -> Vec<(String, PredictionRecord)> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PredictionRecorder for InMemoryRecorder {
    async fn record(&self, record: &PredictionRecord) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.records
            .lock()
            .map_err(|e| anyhow::anyhow!("Lock error: {}", e))?
            .push((id.clone(), record.clone()));
        Ok(id)
    }
}
