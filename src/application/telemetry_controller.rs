// Telemetry controller - Poll loop, watermark and fan-out into monitors
use crate::application::monitor::Monitor;
use crate::application::telemetry_source::TelemetrySource;
use crate::domain::monitor_kind::MonitorKind;
use crate::domain::sample::SampleBatch;
use crate::domain::watermark::Watermark;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{MissedTickBehavior, interval};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;

pub type SharedMonitor = Arc<Mutex<Monitor>>;

/// Static description of a monitor, readable without locking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorInfo {
    pub id: String,
    pub title: String,
    pub kind: MonitorKind,
    pub channel: String,
}

struct ChannelBinding {
    info: MonitorInfo,
    monitor: SharedMonitor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Success { appended: usize, watermark: i64 },
    /// Some fetch failed; nothing was merged
    Failure,
}

pub struct TelemetryController {
    source: Arc<dyn TelemetrySource>,
    bindings: Vec<ChannelBinding>,
    watermark: Watermark,
    poll_interval: Duration,
    // Held while merging a cycle's batches and while clearing, so neither
    // observes the other half done.
    merge_gate: Mutex<()>,
}

impl TelemetryController {
    /// Each monitor is fed by the channel it names.
    pub fn new(
        source: Arc<dyn TelemetrySource>,
        monitors: Vec<Monitor>,
        poll_interval: Duration,
    ) -> Self {
        let bindings = monitors
            .into_iter()
            .map(|monitor| ChannelBinding {
                info: MonitorInfo {
                    id: monitor.id().to_string(),
                    title: monitor.title().to_string(),
                    kind: monitor.kind(),
                    channel: monitor.channel().to_string(),
                },
                monitor: Arc::new(Mutex::new(monitor)),
            })
            .collect();

        Self {
            source,
            bindings,
            watermark: Watermark::default(),
            poll_interval,
            merge_gate: Mutex::new(()),
        }
    }

    pub fn watermark(&self) -> i64 {
        self.watermark.get()
    }

    pub fn monitors(&self) -> impl Iterator<Item = &MonitorInfo> {
        self.bindings.iter().map(|binding| &binding.info)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|binding| binding.info.channel.as_str())
    }

    pub fn monitor(&self, id: &str) -> Option<SharedMonitor> {
        self.bindings
            .iter()
            .find(|binding| binding.info.id == id)
            .map(|binding| binding.monitor.clone())
    }

    /// Create every monitor's chart, waiting for the render surface first.
    pub async fn init_monitors(&self) {
        for binding in &self.bindings {
            let mut monitor = binding.monitor.lock().await;
            if let Err(e) = monitor.init().await {
                tracing::error!(monitor = %binding.info.id, error = %e, "failed to create chart");
            }
        }
    }

    /// Poll forever. The first cycle runs immediately, and a cycle never
    /// starts before the previous one resolved.
    pub async fn run(&self) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut ticks = IntervalStream::new(ticker);

        tracing::info!(
            interval_secs = self.poll_interval.as_secs(),
            monitors = self.bindings.len(),
            "starting telemetry poll loop"
        );

        while ticks.next().await.is_some() {
            match self.run_cycle().await {
                CycleOutcome::Success { appended, watermark } if appended > 0 => {
                    tracing::info!(appended, watermark, "merged new samples");
                }
                CycleOutcome::Success { .. } => tracing::debug!("no new samples"),
                CycleOutcome::Failure => {}
            }
        }
    }

    /// One Requesting → Success/Failure cycle.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let since = self.watermark.get();
        tracing::debug!(since, "requesting samples");

        let channels: Vec<String> = self.channels().map(str::to_string).collect();

        let batches = match self.source.fetch_all_since(&channels, since).await {
            Ok(batches) => batches,
            Err(e) => {
                tracing::warn!(error = %e, since, "poll cycle failed, keeping current data");
                return CycleOutcome::Failure;
            }
        };

        let _gate = self.merge_gate.lock().await;

        // A reset may have landed while the fetches were in flight; merge
        // against whatever the watermark is now.
        let current = self.watermark.get();
        let mut appended = 0;
        let mut latest: Option<i64> = None;

        let empty = SampleBatch::default();
        for binding in &self.bindings {
            let batch = batches.get(&binding.info.channel).unwrap_or(&empty);
            let mut monitor = binding.monitor.lock().await;
            tracing::debug!(
                channel = %binding.info.channel,
                received = batch.len(),
                newest = ?batch.latest(),
                "batch received"
            );

            let outcome = match monitor.merge(batch, current) {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(channel = %binding.info.channel, error = %e, "rejected batch");
                    continue;
                }
            };

            if outcome.appended == 0 {
                continue;
            }

            appended += outcome.appended;
            latest = latest.max(outcome.latest);

            if let Err(e) = monitor.refresh_from_store().await {
                tracing::warn!(monitor = %binding.info.id, error = %e, "refresh aborted");
            }
        }

        let watermark = match latest {
            Some(ts) => self.watermark.advance(ts),
            None => self.watermark.get(),
        };

        CycleOutcome::Success { appended, watermark }
    }

    /// Empty every monitor and rewind the watermark so the next cycle asks
    /// for the full history.
    pub async fn reset_local(&self) {
        let _gate = self.merge_gate.lock().await;

        for binding in &self.bindings {
            let mut monitor = binding.monitor.lock().await;
            if let Err(e) = monitor.reset_data().await {
                tracing::warn!(
                    monitor = %binding.info.id,
                    error = %e,
                    "refresh after reset aborted"
                );
            }
        }

        self.watermark.reset();
        tracing::info!("local telemetry cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::fakes::{RecordingSurface, ScriptedSource};
    use crate::application::telemetry_source::SourceError;
    use crate::domain::sample::SampleBatch;
    use crate::domain::watermark::WATERMARK_MIN;

    fn controller(
        source: &Arc<ScriptedSource>,
        surface: &Arc<RecordingSurface>,
    ) -> TelemetryController {
        let monitors = vec![
            Monitor::climate(
                "climate-interior".to_string(),
                "Interior climate".to_string(),
                "interior".to_string(),
                surface.clone(),
            ),
            Monitor::climate(
                "climate-exterior".to_string(),
                "Exterior climate".to_string(),
                "exterior".to_string(),
                surface.clone(),
            ),
        ];
        TelemetryController::new(source.clone(), monitors, Duration::from_secs(30))
    }

    fn batch(timestamps: &[i64]) -> SampleBatch {
        timestamps
            .iter()
            .map(|&ts| crate::domain::sample::Sample::new(ts, vec![ts as f64 / 10.0, 50.0]))
            .collect()
    }

    async fn timestamps_of(controller: &TelemetryController, id: &str) -> Vec<i64> {
        let monitor = controller.monitor(id).unwrap();
        let monitor = monitor.lock().await;
        monitor.snapshot().timestamps.to_vec()
    }

    #[tokio::test]
    async fn test_cycle_merges_by_channel_name() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("exterior", Ok(batch(&[200, 210])));
        source.push("interior", Ok(batch(&[100, 105])));

        let outcome = controller.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Success {
                appended: 4,
                watermark: 210
            }
        );
        assert_eq!(timestamps_of(&controller, "climate-interior").await, vec![100, 105]);
        assert_eq!(timestamps_of(&controller, "climate-exterior").await, vec![200, 210]);
        assert_eq!(surface.redraw_count("climate-interior"), 1);
        assert_eq!(surface.redraw_count("climate-exterior"), 1);
    }

    #[tokio::test]
    async fn test_next_cycle_requests_since_watermark() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("interior", Ok(batch(&[100, 105])));
        controller.run_cycle().await;
        controller.run_cycle().await;

        let requests = source.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[..2].iter().all(|(_, since)| *since == 0));
        assert!(requests[2..].iter().all(|(_, since)| *since == 105));
    }

    #[tokio::test]
    async fn test_redelivered_samples_are_dropped() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("interior", Ok(batch(&[100, 105])));
        source.push("interior", Ok(batch(&[100, 105])));
        controller.run_cycle().await;
        let outcome = controller.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Success {
                appended: 0,
                watermark: 105
            }
        );
        assert_eq!(timestamps_of(&controller, "climate-interior").await, vec![100, 105]);
        assert_eq!(surface.redraw_count("climate-interior"), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_changes_nothing() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("interior", Ok(batch(&[100])));
        controller.run_cycle().await;

        source.push("interior", Ok(batch(&[300])));
        source.push("exterior", Err(SourceError::Http("connection reset".into())));
        let outcome = controller.run_cycle().await;

        assert_eq!(outcome, CycleOutcome::Failure);
        assert_eq!(controller.watermark(), 100);
        assert_eq!(timestamps_of(&controller, "climate-interior").await, vec![100]);
    }

    #[tokio::test]
    async fn test_invalid_batch_only_skips_its_monitor() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("interior", Ok(SampleBatch::new(vec![100], vec![vec![1.0]])));
        source.push("exterior", Ok(batch(&[120])));
        let outcome = controller.run_cycle().await;

        assert_eq!(
            outcome,
            CycleOutcome::Success {
                appended: 1,
                watermark: 120
            }
        );
        assert!(timestamps_of(&controller, "climate-interior").await.is_empty());
        assert_eq!(timestamps_of(&controller, "climate-exterior").await, vec![120]);
        assert_eq!(surface.redraw_count("climate-interior"), 0);
    }

    #[tokio::test]
    async fn test_reset_local_clears_monitors_and_watermark() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = controller(&source, &surface);
        controller.init_monitors().await;

        source.push("interior", Ok(batch(&[100, 105])));
        controller.run_cycle().await;
        controller.reset_local().await;

        assert_eq!(controller.watermark(), WATERMARK_MIN);
        assert!(timestamps_of(&controller, "climate-interior").await.is_empty());
        let frame = surface.last_frame("climate-interior").unwrap();
        assert!(frame.labels.is_empty());
    }

    #[tokio::test]
    async fn test_stale_fetch_after_reset_is_merged() {
        let source = Arc::new(ScriptedSource::gated());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = Arc::new(controller(&source, &surface));
        controller.init_monitors().await;

        // Establish history, then leave a fetch hanging
        source.push("interior", Ok(batch(&[100, 105])));
        source.release(2);
        controller.run_cycle().await;
        assert_eq!(controller.watermark(), 105);

        source.push("interior", Ok(batch(&[110])));
        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run_cycle().await }
        });
        while source.requests().len() < 4 {
            tokio::task::yield_now().await;
        }
        assert!(source.requests()[2..].iter().all(|(_, since)| *since == 105));

        controller.reset_local().await;
        assert_eq!(controller.watermark(), WATERMARK_MIN);

        source.release(2);
        let outcome = pending.await.unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Success {
                appended: 1,
                watermark: 110
            }
        );
        assert_eq!(timestamps_of(&controller, "climate-interior").await, vec![110]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_fires_immediately() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = Arc::new(controller(&source, &surface));

        let poller = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run().await }
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.requests().len(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(source.requests().len(), 4);

        poller.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_cycle_retries_on_next_period() {
        let source = Arc::new(ScriptedSource::new());
        let surface = Arc::new(RecordingSurface::ready());
        let controller = Arc::new(controller(&source, &surface));
        controller.init_monitors().await;

        source.push("exterior", Err(SourceError::Http("connection refused".into())));
        source.push("exterior", Ok(batch(&[200])));

        let poller = tokio::spawn({
            let controller = controller.clone();
            async move { controller.run().await }
        });

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(source.requests().len(), 2);
        assert_eq!(controller.watermark(), 0);

        // No early retry
        tokio::time::sleep(Duration::from_secs(29)).await;
        assert_eq!(source.requests().len(), 2);

        tokio::time::sleep(Duration::from_secs(1)).await;
        let requests = source.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[2..].iter().all(|(_, since)| *since == 0));
        assert_eq!(controller.watermark(), 200);
        assert_eq!(timestamps_of(&controller, "climate-exterior").await, vec![200]);

        poller.abort();
    }
}
