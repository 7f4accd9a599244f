// Reset coordinator - Confirm, delete remotely, then clear locally
use crate::application::confirmation::{ConfirmError, Confirmation};
use crate::application::telemetry_controller::TelemetryController;
use crate::application::telemetry_source::TelemetrySource;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;

pub const RESET_PROMPT: &str = "Delete all recorded climate data? This cannot be undone.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Cleared,
    /// User said no or dismissed the prompt
    Declined,
    /// Another reset is already waiting for an answer
    Busy,
}

#[derive(Clone)]
pub struct ResetCoordinator {
    confirmation: Arc<dyn Confirmation>,
    source: Arc<dyn TelemetrySource>,
    controller: Arc<TelemetryController>,
    in_flight: Arc<AtomicBool>,
}

/// Frees the in-flight slot when the reset task ends.
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl ResetCoordinator {
    pub fn new(
        confirmation: Arc<dyn Confirmation>,
        source: Arc<dyn TelemetrySource>,
        controller: Arc<TelemetryController>,
    ) -> Self {
        Self {
            confirmation,
            source,
            controller,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Run `request_reset` in the background. Returns `None` without
    /// spawning when a reset started here has not finished yet.
    pub fn begin_reset(&self) -> Option<JoinHandle<ResetOutcome>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let guard = InFlight(self.in_flight.clone());
        let coordinator = self.clone();
        Some(tokio::spawn(async move {
            let _guard = guard;
            coordinator.request_reset().await
        }))
    }

    pub async fn request_reset(&self) -> ResetOutcome {
        match self.confirmation.confirm(RESET_PROMPT).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!("reset declined");
                return ResetOutcome::Declined;
            }
            Err(ConfirmError::Busy) => {
                tracing::warn!("reset requested while another confirmation is pending");
                return ResetOutcome::Busy;
            }
        }

        // The local view follows the user's intent even if the backend
        // could not be reached.
        for channel in self.controller.channels() {
            if let Err(e) = self.source.delete_all(channel).await {
                tracing::warn!(channel, error = %e, "remote delete failed");
            }
        }

        self.controller.reset_local().await;
        ResetOutcome::Cleared
    }
}
