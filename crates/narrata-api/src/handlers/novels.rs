//! Novel submission and progress handlers (spec §4.10 "Intake API").
//! Grounded on `vclip-api/src/handlers/jobs.rs::get_job_status` (trimmed to
//! drop ownership/staleness/event-history, none of which apply without
//! per-user accounts) and `original_source/core/task_manager.py::create_task`
//! (fire-and-forget background activity spawn).

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use narrata_models::{RenderResult, TaskId};
use narrata_pipeline::ParseMode;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const MIN_TEXT_LENGTH: usize = 100;
const MAX_TEXT_LENGTH: usize = 100_000;

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub novel_text: String,
    pub mode: String,
    #[serde(default)]
    pub options: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub task_id: String,
    pub status: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// `POST /api/v1/novels/upload` (spec §9 "request/response shapes").
/// Spawns the orchestrator against a fresh task and returns immediately.
pub async fn upload(
    State(state): State<AppState>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<UploadResponse>)> {
    let char_count = request.novel_text.chars().count();
    if !(MIN_TEXT_LENGTH..=MAX_TEXT_LENGTH).contains(&char_count) {
        return Err(ApiError::validation(format!(
            "novel_text must be between {MIN_TEXT_LENGTH} and {MAX_TEXT_LENGTH} characters, got {char_count}"
        )));
    }
    let mode = ParseMode::parse_str(&request.mode)
        .ok_or_else(|| ApiError::validation(format!("unrecognized mode '{}'", request.mode)))?;

    let task_id = TaskId::new();
    let task = state.registry.create(task_id.clone());

    // `register` keeps the `watch::Sender` alive in `state.cancellations` for
    // the task's lifetime, so a later `cancel(task_id)` has a live channel to
    // signal — a receiver alone, with its sender dropped, reads as "already
    // cancelled" the instant the background task starts (spec §5).
    let cancel_rx = state.cancellations.register(task_id.clone());
    let orchestrator = state.orchestrator.clone();
    let cancellations = state.cancellations.clone();
    let spawned_id = task_id.clone();
    let text = request.novel_text;
    tokio::spawn(async move {
        orchestrator.execute(spawned_id.clone(), text, mode, cancel_rx).await;
        cancellations.remove(&spawned_id);
    });

    Ok((
        axum::http::StatusCode::ACCEPTED,
        Json(UploadResponse {
            task_id: task_id.as_str().to_string(),
            status: "processing".to_string(),
            message: "novel accepted, generation started".to_string(),
            created_at: task.created_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub task_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
    pub progress: u8,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<RenderResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// `GET /api/v1/novels/{task_id}/progress`. 404 if unknown or evicted — the
/// registry does not distinguish the two, so neither does this handler.
pub async fn progress(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<ProgressResponse>> {
    let task_id = TaskId::from(task_id);
    let task = state
        .registry
        .get(&task_id)
        .ok_or_else(|| ApiError::not_found("task not found"))?;

    let latest = state.bus.latest(&task_id);
    let (stage, progress, message) = match latest {
        Some(record) => (record.stage, record.progress, record.message),
        None => (None, 0, "pending".to_string()),
    };

    Ok(Json(ProgressResponse {
        task_id: task.task_id.as_str().to_string(),
        status: task.status.to_string(),
        stage,
        progress,
        message,
        result: task.result,
        error: task.error,
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub task_id: String,
    pub message: String,
}

/// `POST /api/v1/novels/{task_id}/cancel` (spec §5 "A `cancel(task_id)`
/// signals a cancellation token ... propagated through provider calls and
/// subprocesses"). Idempotent and fire-and-forget: accepted as soon as the
/// task is known, whether or not it is still cancellable; the actual
/// transition to `cancelled` (or none, if the task already finished) is
/// only visible via `progress`/`stream`.
pub async fn cancel(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> ApiResult<Json<CancelResponse>> {
    let task_id = TaskId::from(task_id);
    state
        .registry
        .get(&task_id)
        .ok_or_else(|| ApiError::not_found("task not found"))?;

    state.cancellations.cancel(&task_id);

    Ok(Json(CancelResponse {
        task_id: task_id.as_str().to_string(),
        message: "cancellation requested".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_text_below_minimum_length() {
        assert!(MIN_TEXT_LENGTH > 0);
    }

    #[test]
    fn mode_parsing_rejects_unknown_strings() {
        assert!(ParseMode::parse_str("bogus").is_none());
        assert!(ParseMode::parse_str("simple").is_some());
        assert!(ParseMode::parse_str("enhanced").is_some());
    }

    #[test]
    fn cancel_registry_round_trip_matches_handler_expectations() {
        let registry = crate::cancellation::CancellationRegistry::new();
        let task_id = TaskId::new();

        // Unregistered task: nothing to cancel.
        assert!(!registry.cancel(&task_id));

        let rx = registry.register(task_id.clone());
        assert!(registry.cancel(&task_id));
        assert!(*rx.borrow());

        // Once the task finishes, upload's spawn removes the sender.
        registry.remove(&task_id);
        assert!(!registry.cancel(&task_id));
    }
}
