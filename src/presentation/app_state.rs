// Application state for HTTP handlers
use crate::application::reset_coordinator::ResetCoordinator;
use crate::application::telemetry_controller::TelemetryController;
use crate::application::telemetry_source::TelemetrySource;
use crate::infrastructure::chart_board::ChartBoard;
use crate::infrastructure::prompt_board::PromptBoard;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<TelemetryController>,
    pub reset: ResetCoordinator,
    pub prompts: Arc<PromptBoard>,
    pub charts: Arc<ChartBoard>,
    pub source: Arc<dyn TelemetrySource>,
}
