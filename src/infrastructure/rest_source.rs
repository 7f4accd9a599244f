// REST telemetry source - JSON API of the hive monitor
use crate::application::telemetry_source::{BackendVersion, SourceError, TelemetrySource};
use crate::domain::sample::SampleBatch;
use crate::infrastructure::config::BackendSettings;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

const CLIMATE_PATH: &str = "data/climate";

#[derive(Debug, Clone)]
pub struct RestTelemetrySource {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
    retry_delay: Duration,
}

/// `GET data/climate` answers one entry per sensor channel.
type ClimatePayload = HashMap<String, ChannelSamples>;

#[derive(Debug, Deserialize)]
struct ChannelSamples {
    #[serde(default)]
    timestamps: Vec<i64>,
    #[serde(default)]
    samples: Vec<ClimateReading>,
}

#[derive(Debug, Deserialize)]
struct ClimateReading {
    temperature: f64,
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct VersionPayload {
    version: String,
    #[serde(default)]
    major: String,
    #[serde(default)]
    minor: String,
    #[serde(default)]
    patch: String,
    #[serde(default)]
    revision: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct NamePayload {
    name: String,
}

impl ChannelSamples {
    /// Fields follow the climate chart's series order: temperature, humidity
    fn into_batch(self) -> SampleBatch {
        let samples = self
            .samples
            .into_iter()
            .map(|reading| vec![reading.temperature, reading.humidity])
            .collect();
        SampleBatch::new(self.timestamps, samples)
    }
}

fn take_channel(payload: &mut ClimatePayload, channel: &str) -> SampleBatch {
    match payload.remove(channel) {
        Some(samples) => samples.into_batch(),
        None => {
            tracing::debug!(channel, "backend returned no samples for channel");
            SampleBatch::default()
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Http(err.to_string())
        }
    }
}

impl RestTelemetrySource {
    pub fn new(settings: &BackendSettings) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_retries: settings.max_retries,
            retry_delay: settings.retry_delay(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Run `attempt` until it succeeds, fails permanently, or has been
    /// retried `max_retries` times.
    async fn with_retry<T, F, Fut>(&self, operation: &str, mut attempt: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let mut retries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && retries < self.max_retries => {
                    retries += 1;
                    tracing::debug!(operation, retries, error = %e, "retrying backend request");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SourceError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(SourceError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(self.endpoint(path))
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let data = Self::check_status(response).await?.json::<T>().await?;
        Ok(data)
    }

    /// `since` query for samples after `watermark`. The backend treats
    /// `since` as inclusive and parses it as a 32-bit integer, so the
    /// rewound watermark is sent as 0.
    fn since_query(watermark: i64) -> [(&'static str, String); 1] {
        [("since", watermark.saturating_add(1).max(0).to_string())]
    }

    async fn fetch_climate(&self, watermark: i64) -> Result<ClimatePayload, SourceError> {
        let query = Self::since_query(watermark);
        self.with_retry("fetch climate", || self.get_json(CLIMATE_PATH, &query))
            .await
    }
}

#[async_trait]
impl TelemetrySource for RestTelemetrySource {
    async fn fetch_since(&self, channel: &str, watermark: i64) -> Result<SampleBatch, SourceError> {
        let mut payload = self.fetch_climate(watermark).await?;
        Ok(take_channel(&mut payload, channel))
    }

    /// One request answers for every channel
    async fn fetch_all_since(
        &self,
        channels: &[String],
        watermark: i64,
    ) -> Result<HashMap<String, SampleBatch>, SourceError> {
        let mut payload = self.fetch_climate(watermark).await?;
        Ok(channels
            .iter()
            .map(|channel| (channel.clone(), take_channel(&mut payload, channel)))
            .collect())
    }

    async fn delete_all(&self, channel: &str) -> Result<(), SourceError> {
        self.with_retry("delete climate", || async move {
            let response = self
                .client
                .delete(self.endpoint(CLIMATE_PATH))
                .query(&[("channel", channel)])
                .send()
                .await?;
            Self::check_status(response).await?;
            Ok::<_, SourceError>(())
        })
        .await
    }

    async fn version(&self) -> Result<BackendVersion, SourceError> {
        let payload: VersionPayload = self
            .with_retry("version", || self.get_json("version", &[]))
            .await?;

        Ok(BackendVersion {
            version: payload.version,
            major: payload.major,
            minor: payload.minor,
            patch: payload.patch,
            revision: payload.revision,
        })
    }

    async fn name(&self) -> Result<String, SourceError> {
        let payload: NamePayload = self.with_retry("name", || self.get_json("name", &[])).await?;
        Ok(payload.name)
    }

    async fn set_name(&self, name: &str) -> Result<String, SourceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(SourceError::InvalidRequest("hive name cannot be empty".to_string()));
        }

        let body = &NamePayload {
            name: name.to_string(),
        };
        let payload: NamePayload = self
            .with_retry("set name", || async move {
                let response = self
                    .client
                    .put(self.endpoint("name"))
                    .header(ACCEPT, "application/json")
                    .json(body)
                    .send()
                    .await?;
                let payload = Self::check_status(response).await?.json::<NamePayload>().await?;
                Ok::<_, SourceError>(payload)
            })
            .await?;

        Ok(payload.name)
    }
}
