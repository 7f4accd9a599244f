// Chart board - In-memory render surface served to dashboard clients
use crate::application::render_surface::{ChartHandle, RenderError, RenderSurface};
use crate::domain::monitor_kind::{AxisPosition, AxisRange, SeriesSpec};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::{RwLock, watch};

/// Everything a client needs to draw one chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartFrame {
    pub id: String,
    pub title: String,
    pub series: Vec<SeriesFrame>,
    pub labels: Vec<String>,
    pub values: Vec<Vec<f64>>,
    /// Bumped on every redraw so clients can skip unchanged frames
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SeriesFrame {
    pub label: String,
    pub axis: String,
    pub position: &'static str,
    pub min: f64,
    pub max: f64,
    /// False when `min`/`max` are only a starting range
    pub bounded: bool,
    pub color: String,
    pub fill: bool,
}

impl From<&SeriesSpec> for SeriesFrame {
    fn from(spec: &SeriesSpec) -> Self {
        let (min, max, bounded) = match spec.range {
            AxisRange::Suggested { min, max } => (min, max, false),
            AxisRange::Fixed { min, max } => (min, max, true),
        };

        Self {
            label: spec.label.clone(),
            axis: spec.axis_id.clone(),
            position: match spec.position {
                AxisPosition::Left => "left",
                AxisPosition::Right => "right",
            },
            min,
            max,
            bounded,
            color: spec.color.clone(),
            fill: spec.fill,
        }
    }
}

pub struct ChartBoard {
    ready: watch::Sender<bool>,
    charts: RwLock<HashMap<String, ChartFrame>>,
}

impl Default for ChartBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartBoard {
    pub fn new() -> Self {
        Self {
            ready: watch::Sender::new(false),
            charts: RwLock::new(HashMap::new()),
        }
    }

    /// Signal that clients can now be served; releases every `ready()` waiter
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    pub async fn frame(&self, id: &str) -> Option<ChartFrame> {
        self.charts.read().await.get(id).cloned()
    }
}

#[async_trait]
impl RenderSurface for ChartBoard {
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
        title: &str,
        specs: &[SeriesSpec],
    ) -> Result<ChartHandle, RenderError> {
        let mut charts = self.charts.write().await;
        if charts.contains_key(target) {
            return Err(RenderError::DuplicateTarget(target.to_string()));
        }

        charts.insert(
            target.to_string(),
            ChartFrame {
                id: target.to_string(),
                title: title.to_string(),
                series: specs.iter().map(SeriesFrame::from).collect(),
                labels: Vec::new(),
                values: vec![Vec::new(); specs.len()],
                revision: 0,
            },
        );

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
        let mut charts = self.charts.write().await;
        let frame = charts
            .get_mut(&handle.target)
            .ok_or_else(|| RenderError::UnknownTarget(handle.target.clone()))?;

        if values.len() != frame.series.len() {
            return Err(RenderError::SeriesMismatch {
                target: handle.target.clone(),
                expected: frame.series.len(),
                found: values.len(),
            });
        }

        frame.labels = labels;
        frame.values = values;
        frame.revision += 1;
        Ok(())
    }
}
