//! Best-effort delivery of play records to the collector service.
//!
//! One bounded-timeout POST per record. There are no retries anywhere in
//! this module: an unreachable collector drops records silently, everything
//! else that fails is logged and forgotten. Cross-pass deduplication is the
//! collector's job; it answers 409 for records it already knows.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::scores::{Game, PlayRecord};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Terminal fate of a single record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Collector stored the record.
    Accepted,
    /// Collector already knows this record. Counted, not an error.
    Duplicate,
    /// Collector unreachable; the record is dropped without a log line.
    Dropped,
    /// Any other response or transport error. Logged, not retried.
    Failed,
}

/// Per-batch tallies for the summary line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub accepted: usize,
    pub duplicates: usize,
    /// Accepted records that carried the anomaly flag.
    pub anomalies: usize,
}

/// HTTP client for the collector's `POST <base>/<game>/log` endpoint.
#[derive(Clone, Debug)]
pub struct CollectorClient {
    http: Client,
    base_url: String,
}

impl CollectorClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DeliveryError> {
        let http = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub async fn send_record(&self, game: Game, record: &PlayRecord) -> DeliveryOutcome {
        let url = format!("{}/{}/log", self.base_url, game.slug());

        match self.http.post(&url).json(record).send().await {
            Ok(response) => match response.status() {
                status if status.is_success() => DeliveryOutcome::Accepted,
                StatusCode::CONFLICT => DeliveryOutcome::Duplicate,
                status => {
                    warn!("[{}] collector rejected record: {}", game.slug(), status);
                    DeliveryOutcome::Failed
                }
            },
            Err(e) if e.is_connect() => {
                debug!("[{}] collector unreachable, record dropped", game.slug());
                DeliveryOutcome::Dropped
            }
            Err(e) => {
                warn!("[{}] delivery failed: {}", game.slug(), e);
                DeliveryOutcome::Failed
            }
        }
    }

    /// Sends a batch record by record and logs one summary line when
    /// anything was stored or deduplicated.
    pub async fn send_batch(&self, game: Game, records: &[PlayRecord]) -> BatchSummary {
        let mut summary = BatchSummary::default();

        for record in records {
            match self.send_record(game, record).await {
                DeliveryOutcome::Accepted => {
                    summary.accepted += 1;
                    if record.is_anomaly() {
                        summary.anomalies += 1;
                    }
                }
                DeliveryOutcome::Duplicate => summary.duplicates += 1,
                DeliveryOutcome::Dropped | DeliveryOutcome::Failed => {}
            }
        }

        if summary.accepted > 0 || summary.duplicates > 0 {
            info!(
                "[{}] {} stored, {} duplicates, {} flagged anomalous",
                game.slug(),
                summary.accepted,
                summary.duplicates,
                summary.anomalies
            );
        }

        summary
    }
}
