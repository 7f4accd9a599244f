// Presentation layer - Dashboard HTTP API
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/monitors", get(handlers::list_monitors))
        .route("/monitors/:id", get(handlers::get_chart))
        .route("/reset", post(handlers::request_reset))
        .route(
            "/reset/prompt",
            get(handlers::get_prompt)
                .post(handlers::answer_prompt)
                .delete(handlers::dismiss_prompt),
        )
        .route("/version", get(handlers::get_version))
        .route("/name", get(handlers::get_name).put(handlers::put_name))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
