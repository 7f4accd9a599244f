// In-memory doubles for the telemetry, render and confirmation boundaries
use crate::application::confirmation::{ConfirmError, Confirmation};
use crate::application::render_surface::{ChartHandle, RenderError, RenderSurface};
use crate::application::telemetry_source::{BackendVersion, SourceError, TelemetrySource};
use crate::domain::monitor_kind::SeriesSpec;
use crate::domain::sample::SampleBatch;
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::{Semaphore, watch};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFrame {
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

pub struct RecordingSurface {
    ready: watch::Sender<bool>,
    created: Mutex<Vec<String>>,
    frames: Mutex<HashMap<String, Vec<RecordedFrame>>>,
}

impl RecordingSurface {
    pub fn ready() -> Self {
        let surface = Self::pending();
        surface.mark_ready();
        surface
    }

    pub fn pending() -> Self {
        Self {
            ready: watch::Sender::new(false),
            created: Mutex::new(Vec::new()),
            frames: Mutex::new(HashMap::new()),
        }
    }

    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub fn created(&self) -> Vec<String> {
        self.created.lock().unwrap().clone()
    }

    pub fn last_frame(&self, target: &str) -> Option<RecordedFrame> {
        self.frames
            .lock()
            .unwrap()
            .get(target)
            .and_then(|frames| frames.last().cloned())
    }

    pub fn redraw_count(&self, target: &str) -> usize {
        self.frames
            .lock()
            .unwrap()
            .get(target)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl RenderSurface for RecordingSurface {
    async fn ready(&self) -> Result<(), RenderError> {
        let mut rx = self.ready.subscribe();
        rx.wait_for(|ready| *ready)
            .await
            .map(|_| ())
            .map_err(|_| RenderError::Closed)
    }

    async fn create(
        &self,
        target: &str,
        _title: &str,
        specs: &[SeriesSpec],
    ) -> Result<ChartHandle, RenderError> {
        self.created.lock().unwrap().push(target.to_string());
        Ok(ChartHandle {
            target: target.to_string(),
            series: specs.len(),
        })
    }

    async fn redraw(
        &self,
        handle: &ChartHandle,
        labels: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<(), RenderError> {
        self.frames
            .lock()
            .unwrap()
            .entry(handle.target.clone())
            .or_default()
            .push(RecordedFrame { labels, values });
        Ok(())
    }
}

/// Source answering fetches from per-channel queues; an empty queue yields
/// an empty batch.
#[derive(Default)]
pub struct ScriptedSource {
    batches: Mutex<HashMap<String, VecDeque<Result<SampleBatch, SourceError>>>>,
    requests: Mutex<Vec<(String, i64)>>,
    deletes: Mutex<Vec<String>>,
    fail_deletes: bool,
    gate: Option<Semaphore>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch blocks until `release` lets it through
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn failing_deletes() -> Self {
        Self {
            fail_deletes: true,
            ..Self::default()
        }
    }

    pub fn push(&self, channel: &str, response: Result<SampleBatch, SourceError>) {
        self.batches
            .lock()
            .unwrap()
            .entry(channel.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn release(&self, fetches: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(fetches);
        }
    }

    pub fn requests(&self) -> Vec<(String, i64)> {
        self.requests.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }
}

#[async_trait]
impl TelemetrySource for ScriptedSource {
    async fn fetch_since(&self, channel: &str, watermark: i64) -> Result<SampleBatch, SourceError> {
        self.requests
            .lock()
            .unwrap()
            .push((channel.to_string(), watermark));

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.batches
            .lock()
            .unwrap()
            .get_mut(channel)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(SampleBatch::default()))
    }

    async fn delete_all(&self, channel: &str) -> Result<(), SourceError> {
        self.deletes.lock().unwrap().push(channel.to_string());
        if self.fail_deletes {
            return Err(SourceError::Http("connection refused".to_string()));
        }
        Ok(())
    }

    async fn version(&self) -> Result<BackendVersion, SourceError> {
        Ok(BackendVersion {
            version: "beewatch v0.1.0".to_string(),
            major: "0".to_string(),
            minor: "1".to_string(),
            patch: "0".to_string(),
            revision: "abc123".to_string(),
        })
    }

    async fn name(&self) -> Result<String, SourceError> {
        Ok("Your Hive".to_string())
    }

    async fn set_name(&self, name: &str) -> Result<String, SourceError> {
        Ok(name.to_string())
    }
}

/// Confirmation that always gives the same answer
pub struct ScriptedConfirmation {
    answer: Result<bool, ConfirmError>,
    asked: AtomicUsize,
}

impl ScriptedConfirmation {
    pub fn answering(answer: Result<bool, ConfirmError>) -> Self {
        Self {
            answer,
            asked: AtomicUsize::new(0),
        }
    }

    pub fn asked(&self) -> usize {
        self.asked.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Confirmation for ScriptedConfirmation {
    async fn confirm(&self, _prompt: &str) -> Result<bool, ConfirmError> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer.clone()
    }
}
