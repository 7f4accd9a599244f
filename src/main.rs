// Main entry point - Dependency injection and server setup
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use hive_dashboard::application::monitor::Monitor;
use hive_dashboard::application::reset_coordinator::ResetCoordinator;
use hive_dashboard::application::telemetry_controller::TelemetryController;
use hive_dashboard::application::telemetry_source::TelemetrySource;
use hive_dashboard::infrastructure::chart_board::ChartBoard;
use hive_dashboard::infrastructure::config::load_dashboard_config;
use hive_dashboard::infrastructure::prompt_board::PromptBoard;
use hive_dashboard::infrastructure::rest_source::RestTelemetrySource;
use hive_dashboard::presentation::app_state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_dashboard_config()?;
    config.validate()?;

    // Create adapters (infrastructure layer)
    let source: Arc<dyn TelemetrySource> = Arc::new(RestTelemetrySource::new(&config.backend)?);
    let charts = Arc::new(ChartBoard::new());
    let prompts = Arc::new(PromptBoard::new(config.reset.confirm_timeout()));

    // Create monitors and services (application layer)
    let monitors = config
        .monitors
        .iter()
        .map(|m| m.build(charts.clone()))
        .collect::<anyhow::Result<Vec<Monitor>>>()?;
    let controller = Arc::new(TelemetryController::new(
        source.clone(),
        monitors,
        config.poll.interval(),
    ));
    let reset = ResetCoordinator::new(prompts.clone(), source.clone(), controller.clone());

    tokio::spawn({
        let source = source.clone();
        async move {
            match source.version().await {
                Ok(version) => {
                    tracing::info!(version = %version.version, "connected to sensor backend")
                }
                Err(e) => tracing::warn!(error = %e, "sensor backend version unavailable"),
            }
        }
    });

    // Charts are created once the board starts serving, then polling begins
    let pipeline = tokio::spawn({
        let controller = controller.clone();
        async move {
            controller.init_monitors().await;
            controller.run().await;
        }
    });

    let state = Arc::new(AppState {
        controller,
        reset,
        prompts,
        charts: charts.clone(),
        source,
    });
    let router = hive_dashboard::presentation::router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(
        addr = %config.server.bind,
        backend = %config.backend.base_url,
        "starting hive dashboard"
    );
    charts.mark_ready();

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for shutdown signal");
            }
        })
        .await?;

    pipeline.abort();
    tracing::info!("dashboard stopped");
    Ok(())
}
