// HTTP request handlers
use crate::application::telemetry_source::SourceError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Deserialize)]
pub struct PromptAnswer {
    pub accept: bool,
}

#[derive(Deserialize)]
pub struct NameUpdate {
    pub name: String,
}

fn error_response(status: StatusCode, message: impl ToString) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

fn source_error_response(e: SourceError) -> Response {
    let status = match e {
        SourceError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::BAD_GATEWAY,
    };
    error_response(status, e)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// List configured monitors
pub async fn list_monitors(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let monitors: Vec<_> = state
        .controller
        .monitors()
        .map(|m| {
            json!({
                "id": m.id,
                "title": m.title,
                "kind": m.kind.tag(),
                "channel": m.channel,
            })
        })
        .collect();

    Json(json!({
        "watermark": state.controller.watermark(),
        "monitors": monitors,
    }))
}

/// Latest rendered frame of one monitor's chart
pub async fn get_chart(Path(id): Path<String>, State(state): State<Arc<AppState>>) -> Response {
    match state.charts.frame(&id).await {
        Some(frame) => Json(frame).into_response(),
        None => error_response(StatusCode::NOT_FOUND, format!("no chart for monitor {}", id)),
    }
}

/// Start a reset; it proceeds once the prompt is answered
pub async fn request_reset(State(state): State<Arc<AppState>>) -> Response {
    if state.reset.begin_reset().is_none() {
        return error_response(StatusCode::CONFLICT, "a reset is already in progress");
    }

    (
        StatusCode::ACCEPTED,
        Json(json!({ "status": "awaiting confirmation" })),
    )
        .into_response()
}

pub async fn get_prompt(State(state): State<Arc<AppState>>) -> Response {
    match state.prompts.pending().await {
        Some(prompt) => Json(json!({ "id": prompt.id, "message": prompt.message })).into_response(),
        None => error_response(StatusCode::NOT_FOUND, "no pending prompt"),
    }
}

pub async fn answer_prompt(
    State(state): State<Arc<AppState>>,
    Json(answer): Json<PromptAnswer>,
) -> Response {
    if state.prompts.answer(answer.accept).await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "no pending prompt")
    }
}

pub async fn dismiss_prompt(State(state): State<Arc<AppState>>) -> Response {
    if state.prompts.dismiss().await {
        StatusCode::NO_CONTENT.into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "no pending prompt")
    }
}

/// Version of the sensor backend
pub async fn get_version(State(state): State<Arc<AppState>>) -> Response {
    match state.source.version().await {
        Ok(version) => Json(json!({
            "version": version.version,
            "major": version.major,
            "minor": version.minor,
            "patch": version.patch,
            "revision": version.revision,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!(error = %e, "failed to fetch backend version");
            source_error_response(e)
        }
    }
}

pub async fn get_name(State(state): State<Arc<AppState>>) -> Response {
    match state.source.name().await {
        Ok(name) => Json(json!({ "name": name })).into_response(),
        Err(e) => source_error_response(e),
    }
}

pub async fn put_name(
    State(state): State<Arc<AppState>>,
    Json(update): Json<NameUpdate>,
) -> Response {
    match state.source.set_name(&update.name).await {
        Ok(name) => Json(json!({ "name": name })).into_response(),
        Err(e) => source_error_response(e),
    }
}
