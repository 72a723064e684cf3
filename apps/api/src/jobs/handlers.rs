use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Multipart, Query, State,
    },
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingestion::validator::{validate, IncomingFile};
use crate::jobs::sweeper::sweep_stale_jobs;
use crate::models::analysis::AnalysisJobRow;
use crate::state::AppState;
use crate::storage::cv_object_path;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub user_id: String,
    pub cv_file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessResponse {
    pub success: bool,
    pub message: String,
    pub analysis_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub analysis_id: Uuid,
    pub cv_file_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisQuery {
    pub user_id: String,
    pub cv_file_path: String,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub success: bool,
    pub analysis: AnalysisJobRow,
}

#[derive(Debug, Serialize)]
pub struct SweepResponse {
    pub success: bool,
    pub failed: Vec<Uuid>,
}

/// POST /api/v1/cv/upload
///
/// Validates and stores the file, records a pending job, then hands the job
/// to a background task. Answers before analysis starts.
pub async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut user_id: Option<String> = None;
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                user_id = Some(value.trim().to_string());
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                file = Some((file_name, content_type, bytes));
            }
            _ => {}
        }
    }

    let user_id = user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let (file_name, content_type, bytes) =
        file.ok_or_else(|| AppError::Validation("file is required".to_string()))?;

    let declared = validate(&IncomingFile {
        file_name: &file_name,
        content_type: content_type.as_deref(),
        bytes: &bytes,
    })?;

    let cv_file_path = cv_object_path(&user_id, Utc::now(), declared.extension());
    ensure_path_free(&state, &user_id, &cv_file_path).await?;
    state
        .storage
        .upload(&cv_file_path, bytes, declared.mime_type())
        .await?;
    let job = register_job(&state, &user_id, &cv_file_path).await?;

    let orchestrator = state.orchestrator.clone();
    let (worker_user, worker_path) = (user_id.clone(), cv_file_path.clone());
    tokio::spawn(async move {
        if let Err(e) = orchestrator.process(&worker_user, &worker_path).await {
            warn!("Background analysis of {worker_path} ended with error: {e}");
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(UploadResponse {
            success: true,
            message: "CV uploaded; analysis started".to_string(),
            analysis_id: job.id,
            cv_file_path,
        }),
    ))
}

/// Rejects a path that already has a job so its stored file isn't replaced.
async fn ensure_path_free(state: &AppState, user_id: &str, cv_file_path: &str) -> Result<(), AppError> {
    match state.jobs.find(user_id, cv_file_path).await? {
        Some(existing) => Err(AppError::Conflict(format!(
            "An analysis for '{cv_file_path}' already exists ({})",
            existing.processing_status
        ))),
        None => Ok(()),
    }
}

/// Records the pending job for a freshly stored file. A second job for the
/// same path is a conflict and never reaches the orchestrator.
async fn register_job(
    state: &AppState,
    user_id: &str,
    cv_file_path: &str,
) -> Result<AnalysisJobRow, AppError> {
    let job = state
        .jobs
        .create_pending(user_id, cv_file_path)
        .await?
        .ok_or_else(|| {
            AppError::Conflict(format!("An analysis for '{cv_file_path}' already exists"))
        })?;
    info!("Job {} created: pending ({})", job.id, cv_file_path);
    Ok(job)
}

/// POST /api/v1/cv/process
pub async fn handle_process(
    State(state): State<AppState>,
    payload: Result<Json<ProcessRequest>, JsonRejection>,
) -> Result<Json<ProcessResponse>, AppError> {
    let Json(req) = payload.map_err(|e| AppError::Validation(e.body_text()))?;
    if req.user_id.trim().is_empty() || req.cv_file_path.trim().is_empty() {
        return Err(AppError::Validation(
            "userId and cvFilePath are required".to_string(),
        ));
    }

    let outcome = state
        .orchestrator
        .process(&req.user_id, &req.cv_file_path)
        .await?;

    Ok(Json(ProcessResponse {
        success: true,
        message: "CV analysis completed".to_string(),
        analysis_id: outcome.analysis_id,
    }))
}

/// GET /api/v1/cv/analysis?userId=…&cvFilePath=…
pub async fn handle_get_analysis(
    State(state): State<AppState>,
    params: Result<Query<AnalysisQuery>, QueryRejection>,
) -> Result<Json<AnalysisResponse>, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let analysis = state
        .jobs
        .find(&params.user_id, &params.cv_file_path)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("No analysis found for '{}'", params.cv_file_path))
        })?;

    Ok(Json(AnalysisResponse {
        success: true,
        analysis,
    }))
}

/// POST /api/v1/cv/sweep
pub async fn handle_sweep(State(state): State<AppState>) -> Result<Json<SweepResponse>, AppError> {
    let stale_after = chrono::Duration::minutes(state.config.stale_job_minutes);
    let report = sweep_stale_jobs(state.jobs.as_ref(), stale_after).await?;
    Ok(Json(SweepResponse {
        success: true,
        failed: report.failed,
    }))
}
