// Monitor - a sample store bound to the chart that displays it
use crate::application::render_surface::{ChartHandle, RenderError, RenderSurface};
use crate::domain::monitor_kind::MonitorKind;
use crate::domain::sample::SampleBatch;
use crate::domain::store::{MergeOutcome, SampleStore, StoreSnapshot, ValidationError};
use chrono::DateTime;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("monitor {0} has no chart yet")]
    NotInitialized(String),

    #[error("invalid data on monitor {id}: {source}")]
    Validation {
        id: String,
        #[source]
        source: ValidationError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub struct Monitor {
    id: String,
    title: String,
    kind: MonitorKind,
    channel: String,
    store: SampleStore,
    surface: Arc<dyn RenderSurface>,
    chart: Option<ChartHandle>,
}

impl Monitor {
    pub fn new(
        id: String,
        title: String,
        kind: MonitorKind,
        channel: String,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self {
            store: SampleStore::new(kind.series_count()),
            id,
            title,
            kind,
            channel,
            surface,
            chart: None,
        }
    }

    /// Temperature/humidity monitor fed by `channel`
    pub fn climate(
        id: String,
        title: String,
        channel: String,
        surface: Arc<dyn RenderSurface>,
    ) -> Self {
        Self::new(id, title, MonitorKind::Climate, channel, surface)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn kind(&self) -> MonitorKind {
        self.kind
    }

    pub fn kind_tag(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn snapshot(&self) -> StoreSnapshot<'_> {
        self.store.snapshot()
    }

    /// Wait for the surface to become ready, then create the empty chart.
    /// Later calls are no-ops.
    pub async fn init(&mut self) -> Result<(), MonitorError> {
        if self.chart.is_some() {
            return Ok(());
        }

        self.surface.ready().await?;
        let chart = self
            .surface
            .create(&self.id, &self.title, &self.kind.series_specs())
            .await?;

        tracing::debug!(monitor = %self.id, kind = self.kind_tag(), "chart created");
        self.chart = Some(chart);
        Ok(())
    }

    pub fn merge(
        &mut self,
        batch: &SampleBatch,
        watermark: i64,
    ) -> Result<MergeOutcome, MonitorError> {
        self.store
            .merge(batch, watermark)
            .map_err(|source| MonitorError::Validation {
                id: self.id.clone(),
                source,
            })
    }

    /// Redraw the chart from the full store contents.
    ///
    /// Labels and points are replaced, never appended. A store that does not
    /// match the chart's shape aborts the redraw and the chart keeps showing
    /// what it showed before.
    pub async fn refresh_from_store(&self) -> Result<(), MonitorError> {
        let chart = self
            .chart
            .as_ref()
            .ok_or_else(|| MonitorError::NotInitialized(self.id.clone()))?;

        let snapshot = self.store.snapshot();
        snapshot
            .validate(chart.series)
            .map_err(|source| MonitorError::Validation {
                id: self.id.clone(),
                source,
            })?;

        let labels = snapshot.timestamps.iter().map(|&ts| format_label(ts)).collect();
        let values = snapshot.series.to_vec();
        self.surface.redraw(chart, labels, values).await?;
        Ok(())
    }

    /// Empty the store and redraw the (now empty) chart
    pub async fn reset_data(&mut self) -> Result<(), MonitorError> {
        self.store.reset();
        self.refresh_from_store().await
    }
}

/// Short date label for a unix timestamp, in UTC
pub fn format_label(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d, %H:%M").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
