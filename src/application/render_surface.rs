// Render surface trait - boundary to whatever draws the charts
use crate::domain::monitor_kind::SeriesSpec;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("no chart created for target {0}")]
    UnknownTarget(String),

    #[error("a chart already exists for target {0}")]
    DuplicateTarget(String),

    #[error("chart {target} renders {expected} series, got {found}")]
    SeriesMismatch {
        target: String,
        expected: usize,
        found: usize,
    },

    #[error("render surface shut down before becoming ready")]
    Closed,
}

/// Handle to a chart created on a surface.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChartHandle {
    pub target: String,
    pub series: usize,
}

#[async_trait]
pub trait RenderSurface: Send + Sync {
    /// Resolves once the surface accepts `create` calls.
    async fn ready(&self) -> Result<(), RenderError>;

    /// Create an empty chart for `target`. Called once per monitor.
    async fn create(
        &self,
        target: &str,
        title: &str,
        specs: &[SeriesSpec],
    ) -> Result<ChartHandle, RenderError>;

    /// Replace everything the chart displays.
    async fn redraw(
        &self,
        handle: &ChartHandle,
        labels: Vec<String>,
        values: Vec<Vec<f64>>,
    ) -> Result<(), RenderError>;
}
