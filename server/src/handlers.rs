//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Json,
};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use bgtranslate::{supervisor, TranslationJob};

use crate::state::AppState;

pub type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (status, Json(json!({ "error": message.into() })))
}

#[derive(Debug, Deserialize)]
pub struct BackgroundTranslateRequest {
    #[serde(rename = "jobId", default)]
    pub job_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BackgroundTranslateResponse {
    pub started: bool,
    #[serde(rename = "jobId")]
    pub job_id: String,
}

/// Schedules the job on a supervised background task and answers right away.
/// Failures are only visible through the job record.
pub async fn background_translate(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<BackgroundTranslateRequest>, JsonRejection>,
) -> Result<Json<BackgroundTranslateResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|e| api_error(StatusCode::BAD_REQUEST, e.body_text()))?;
    let job_id = request
        .job_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "jobId is required"))?;

    info!("Scheduling translation job {}", job_id);
    supervisor::spawn(
        state.dispatcher.clone(),
        job_id.clone(),
        state.supervisor.clone(),
    );

    Ok(Json(BackgroundTranslateResponse {
        started: true,
        job_id,
    }))
}

pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TranslationJob>, ApiError> {
    match state.dispatcher.repository().find(&id).await {
        Ok(Some(job)) => Ok(Json(job)),
        Ok(None) => Err(api_error(StatusCode::NOT_FOUND, format!("Job '{}' not found", id))),
        Err(e) => {
            error!("Failed to load job {}: {}", id, e);
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

/// Flags a running or pending job as cancelled. The worker notices it before
/// its next batch.
pub async fn cancel_job(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let repo = state.dispatcher.repository();
    let internal = |e: bgtranslate::job::JobRepoError| {
        error!("Failed to cancel job {}: {}", id, e);
        api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    };

    if repo.cancel(&id).await.map_err(internal)? {
        info!("Job {} cancelled", id);
        return Ok(Json(json!({ "cancelled": true, "jobId": id })));
    }

    match repo.status(&id).await.map_err(internal)? {
        Some(status) => Err(api_error(
            StatusCode::CONFLICT,
            format!("Job '{}' is already {}", id, status),
        )),
        None => Err(api_error(StatusCode::NOT_FOUND, format!("Job '{}' not found", id))),
    }
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
