//! Checkpoint publishing to the DA layer.
//!
//! `publish` is synchronous from the caller's view and idempotent under
//! retry of a byte-identical payload: the DA layer content-addresses blobs,
//! so re-publishing yields the same id. Transient failures are retried with
//! exponential backoff across the configured endpoint list; permanent
//! failures surface to the caller, which aborts the in-flight pipeline
//! without mutating ledger state.

use alloy::primitives::keccak256;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{BridgeError, Result};

/// DA-layer publisher contract: `store(bytes, epochs) -> blobId`.
#[async_trait]
pub trait CheckpointPublisher: Send + Sync {
    async fn publish(&self, blob: &[u8]) -> Result<String>;
}

/// Retry schedule for transient publish failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (first try included)
    pub max_attempts: u32,
    /// Initial backoff duration
    pub initial_backoff: Duration,
    /// Maximum backoff duration
    pub max_backoff: Duration,
    /// Backoff multiplier for exponential growth
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Backoff duration for a given attempt (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(attempt as i32);
        let capped = backoff_secs.min(self.max_backoff.as_secs_f64());
        Duration::from_secs_f64(capped)
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt + 1 < self.max_attempts
    }
}

/// Whether an HTTP status from the DA layer is worth retrying.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
}

/// Parse a comma-separated endpoint list into individual trimmed URLs.
pub fn parse_endpoint_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/').to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

// Walrus publisher response: one arm per storage outcome.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreResponse {
    newly_created: Option<NewlyCreated>,
    already_certified: Option<AlreadyCertified>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewlyCreated {
    blob_object: BlobObject,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlobObject {
    blob_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlreadyCertified {
    blob_id: String,
}

/// HTTP publisher against a Walrus publisher endpoint list.
///
/// Endpoints are tried in order per attempt; attempts back off
/// exponentially. A 4xx other than 408/429 is permanent.
pub struct WalrusPublisher {
    endpoints: Vec<String>,
    client: reqwest::Client,
    store_epochs: u64,
    retry: RetryConfig,
}

impl WalrusPublisher {
    pub fn new(endpoints: Vec<String>, timeout: Duration, store_epochs: u64) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(BridgeError::invariant(
                "at least one DA publisher endpoint is required",
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BridgeError::permanent("publisher", e.to_string()))?;
        Ok(Self {
            endpoints,
            client,
            store_epochs,
            retry: RetryConfig::default(),
        })
    }

    async fn store_once(&self, endpoint: &str, blob: &[u8]) -> Result<String> {
        let url = format!("{}/v1/blobs?epochs={}", endpoint, self.store_epochs);
        let response = self
            .client
            .put(&url)
            .body(blob.to_vec())
            .send()
            .await
            .map_err(|e| BridgeError::transient("publisher", e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let reason = format!("{} returned {}", endpoint, status);
            return if is_transient_status(status) {
                Err(BridgeError::transient("publisher", reason))
            } else {
                Err(BridgeError::permanent("publisher", reason))
            };
        }

        let body: StoreResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::transient("publisher", e.to_string()))?;
        if let Some(created) = body.newly_created {
            return Ok(created.blob_object.blob_id);
        }
        if let Some(certified) = body.already_certified {
            return Ok(certified.blob_id);
        }
        Err(BridgeError::permanent(
            "publisher",
            "store response carried no blob id",
        ))
    }
}

#[async_trait]
impl CheckpointPublisher for WalrusPublisher {
    async fn publish(&self, blob: &[u8]) -> Result<String> {
        let mut attempt = 0u32;
        loop {
            let mut last_err = None;
            for endpoint in &self.endpoints {
                match self.store_once(endpoint, blob).await {
                    Ok(blob_id) => {
                        tracing::debug!(endpoint = %endpoint, blob_id = %blob_id, "Blob stored");
                        return Ok(blob_id);
                    }
                    Err(err @ BridgeError::ExternalPermanent { .. }) => return Err(err),
                    Err(err) => {
                        tracing::warn!(endpoint = %endpoint, error = %err, "Publisher endpoint failed");
                        last_err = Some(err);
                    }
                }
            }
            let err = last_err
                .unwrap_or_else(|| BridgeError::transient("publisher", "no endpoints responded"));
            if !self.retry.should_retry(attempt) {
                return Err(err);
            }
            let backoff = self.retry.backoff_for_attempt(attempt);
            tracing::warn!(
                attempt = attempt + 1,
                max = self.retry.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                "All publisher endpoints failed, retrying"
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }
}

/// Default publisher for test environments: no I/O, returns a deterministic
/// content id derived from the payload. Matches the content-addressing
/// property of the real DA layer.
#[derive(Debug, Default)]
pub struct LocalPublisher;

impl LocalPublisher {
    pub fn new() -> Self {
        LocalPublisher
    }

    pub fn blob_id_for(blob: &[u8]) -> String {
        format!("0x{}", hex::encode(keccak256(blob)))
    }
}

#[async_trait]
impl CheckpointPublisher for LocalPublisher {
    async fn publish(&self, blob: &[u8]) -> Result<String> {
        Ok(Self::blob_id_for(blob))
    }
}
