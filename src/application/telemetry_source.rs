// Telemetry source trait - boundary to the sensor backend
use crate::domain::sample::SampleBatch;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::collections::HashMap;
use thiserror::Error;

/// Errors surfaced by a telemetry source once its own retries are exhausted.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Request never completed (connect, timeout, broken body).
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Backend answered with a non-success status.
    #[error("backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Request rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl SourceError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(_) => true,
            SourceError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceError::Parse(_) | SourceError::InvalidRequest(_) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendVersion {
    pub version: String,
    pub major: String,
    pub minor: String,
    pub patch: String,
    pub revision: String,
}

#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Samples of `channel` dated after `watermark`
    async fn fetch_since(&self, channel: &str, watermark: i64) -> Result<SampleBatch, SourceError>;

    /// Samples of every listed channel dated after `watermark`, keyed by
    /// channel. Sources that serve all channels in one response should
    /// override this so a cycle sees a single consistent snapshot.
    async fn fetch_all_since(
        &self,
        channels: &[String],
        watermark: i64,
    ) -> Result<HashMap<String, SampleBatch>, SourceError> {
        let fetches = channels.iter().map(|channel| self.fetch_since(channel, watermark));
        let batches = try_join_all(fetches).await?;
        Ok(channels.iter().cloned().zip(batches).collect())
    }

    /// Delete every sample the backend holds for `channel`
    async fn delete_all(&self, channel: &str) -> Result<(), SourceError>;

    async fn version(&self) -> Result<BackendVersion, SourceError>;

    /// Display name of the monitored hive
    async fn name(&self) -> Result<String, SourceError>;

    /// Rename the hive, returning the name the backend stored
    async fn set_name(&self, name: &str) -> Result<String, SourceError>;
}
