//! Pipeline Orchestrator: drives one analysis job from `pending` to a
//! terminal status.
//!
//! Flow: claim (pending → processing) → download → detect format → extract →
//!       analyze → complete (processing → completed).
//!
//! Any stage error is caught here, written to `processing_error` and the job
//! is moved to `failed`. Status writes that fail after the outcome is known
//! are logged and never replace the stage error.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{AnalysisError, StructuredAnalysisClient};
use crate::ingestion::extract::{extract_document, ExtractionError};
use crate::jobs::store::{JobStore, JobStoreError};
use crate::llm_client::LlmError;
use crate::models::analysis::AnalysisJobRow;
use crate::models::profile::StructuredProfile;
use crate::storage::{ObjectStore, StorageError};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to retrieve CV file: {0}")]
    Retrieval(#[from] StorageError),

    #[error("Unsupported file format (leading bytes: {0})")]
    UnsupportedFormat(String),

    #[error("Text extraction did not finish: {0}")]
    ExtractionAborted(String),

    #[error("Invalid response from analysis service: {0}")]
    InvalidResponse(String),

    #[error("Analysis service call failed: {0}")]
    Inference(#[from] LlmError),

    #[error("No analysis job found for '{0}'")]
    JobNotFound(String),

    #[error("Analysis job for '{path}' is already {status}")]
    AlreadyClaimed { path: String, status: String },

    #[error("Analysis job {0} left the processing state before results were saved")]
    StatusConflict(Uuid),

    #[error("Job store error: {0}")]
    Store(#[from] JobStoreError),
}

impl From<ExtractionError> for PipelineError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::UnsupportedFormat(leading) => PipelineError::UnsupportedFormat(leading),
        }
    }
}

impl From<AnalysisError> for PipelineError {
    fn from(e: AnalysisError) -> Self {
        match e {
            AnalysisError::Inference(e) => PipelineError::Inference(e),
            AnalysisError::InvalidResponse(detail) => PipelineError::InvalidResponse(detail),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub analysis_id: Uuid,
    pub profile: StructuredProfile,
}

#[derive(Clone)]
pub struct Orchestrator {
    storage: Arc<dyn ObjectStore>,
    jobs: Arc<dyn JobStore>,
    analyzer: StructuredAnalysisClient,
}

impl Orchestrator {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        jobs: Arc<dyn JobStore>,
        analyzer: StructuredAnalysisClient,
    ) -> Self {
        Self {
            storage,
            jobs,
            analyzer,
        }
    }

    /// Processes the job for `(user_id, cv_file_path)` to a terminal status.
    pub async fn process(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<ProcessOutcome, PipelineError> {
        let job = self.claim(user_id, cv_file_path).await?;
        info!("Job {} claimed: pending -> processing ({})", job.id, cv_file_path);

        match self.run_stages(&job).await {
            Ok(profile) => self.record_success(job.id, profile).await,
            Err(e) => {
                self.record_failure(job.id, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn claim(&self, user_id: &str, cv_file_path: &str) -> Result<AnalysisJobRow, PipelineError> {
        if let Some(job) = self.jobs.claim(user_id, cv_file_path).await? {
            return Ok(job);
        }

        match self.jobs.find(user_id, cv_file_path).await? {
            Some(existing) => {
                if existing.status().is_some_and(|status| status.is_terminal()) {
                    info!(
                        "Job {} not claimed: already finished as {}",
                        existing.id, existing.processing_status
                    );
                } else {
                    warn!(
                        "Job {} not claimed: status is already {}",
                        existing.id, existing.processing_status
                    );
                }
                Err(PipelineError::AlreadyClaimed {
                    path: cv_file_path.to_string(),
                    status: existing.processing_status,
                })
            }
            None => Err(PipelineError::JobNotFound(cv_file_path.to_string())),
        }
    }

    async fn run_stages(&self, job: &AnalysisJobRow) -> Result<StructuredProfile, PipelineError> {
        let bytes = self.storage.download(&job.cv_file_path).await?;
        info!("Job {}: downloaded {} bytes", job.id, bytes.len());

        // CPU-bound extraction on the blocking pool.
        let (format, extracted) = tokio::task::spawn_blocking(move || extract_document(&bytes))
            .await
            .map_err(|e| PipelineError::ExtractionAborted(e.to_string()))??;

        let profile = self.analyzer.analyze(&extracted, format).await?;
        info!(
            "Job {}: analysis returned match_score {:.2}",
            job.id, profile.match_score
        );
        Ok(profile)
    }

    async fn record_success(
        &self,
        id: Uuid,
        profile: StructuredProfile,
    ) -> Result<ProcessOutcome, PipelineError> {
        match self.jobs.complete(id, &profile, Utc::now()).await {
            Ok(true) => {
                info!("Job {id}: processing -> completed");
                Ok(ProcessOutcome {
                    analysis_id: id,
                    profile,
                })
            }
            Ok(false) => {
                warn!("Job {id}: results discarded, job is no longer processing");
                Err(PipelineError::StatusConflict(id))
            }
            Err(e) => {
                error!("Job {id}: failed to save analysis results: {e}");
                let err = PipelineError::Store(e);
                self.record_failure(id, &err.to_string()).await;
                Err(err)
            }
        }
    }

    /// Best-effort `processing → failed`. Persistence errors are only logged.
    async fn record_failure(&self, id: Uuid, message: &str) {
        match self.jobs.fail(id, message).await {
            Ok(true) => info!("Job {id}: processing -> failed: {message}"),
            Ok(false) => warn!("Job {id}: not marked failed, job is no longer processing"),
            Err(e) => error!("Job {id}: could not record failure '{message}': {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::analysis::ProcessingStatus;
    use crate::testing::{sample_pdf, MemoryJobStore, MemoryObjectStore, ScriptedGenerator};
    use bytes::Bytes;

    const USER: &str = "user-1";
    const PATH: &str = "user-1/cv_1700000000000.pdf";

    struct Harness {
        storage: Arc<MemoryObjectStore>,
        jobs: Arc<MemoryJobStore>,
        orchestrator: Orchestrator,
    }

    fn harness(generator: ScriptedGenerator) -> Harness {
        let storage = Arc::new(MemoryObjectStore::default());
        let jobs = Arc::new(MemoryJobStore::default());
        let orchestrator = Orchestrator::new(
            storage.clone(),
            jobs.clone(),
            StructuredAnalysisClient::new(Arc::new(generator)),
        );
        Harness {
            storage,
            jobs,
            orchestrator,
        }
    }

    async fn seed(h: &Harness, bytes: Vec<u8>) -> Uuid {
        h.storage.insert(PATH, Bytes::from(bytes));
        h.jobs.create_pending(USER, PATH).await.unwrap().unwrap().id
    }

    #[tokio::test]
    async fn test_success_path_completes_job() {
        let h = harness(ScriptedGenerator::reply(
            "```json\n{\"match_score\": 0.8, \"strengths\": [\"Strong publication record\"]}\n```",
        ));
        let id = seed(&h, sample_pdf("John Doe Software Engineer")).await;

        let outcome = h.orchestrator.process(USER, PATH).await.unwrap();
        assert_eq!(outcome.analysis_id, id);

        let row = h.jobs.get(id).unwrap();
        assert_eq!(row.status(), Some(ProcessingStatus::Completed));
        assert_eq!(row.match_score, Some(0.8));
        assert!(row.processed_at.is_some());
        assert!(row.processing_error.is_none());
        assert_eq!(row.education, Some(serde_json::json!([])));
        assert_eq!(
            h.jobs.history(id),
            vec![
                ProcessingStatus::Pending,
                ProcessingStatus::Processing,
                ProcessingStatus::Completed
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_response_fails_job_with_message() {
        let h = harness(ScriptedGenerator::reply("I cannot process this request"));
        let id = seed(&h, sample_pdf("John Doe Software Engineer")).await;

        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse(_)));

        let row = h.jobs.get(id).unwrap();
        assert_eq!(row.status(), Some(ProcessingStatus::Failed));
        assert_eq!(row.processing_error.as_deref(), Some(err.to_string().as_str()));
        assert!(row
            .processing_error
            .unwrap()
            .contains("I cannot process this request"));
        assert!(row.match_score.is_none());
        assert!(row.personal_info.is_none());
        assert_eq!(
            h.jobs.history(id),
            vec![
                ProcessingStatus::Pending,
                ProcessingStatus::Processing,
                ProcessingStatus::Failed
            ]
        );
    }

    #[tokio::test]
    async fn test_unsupported_format_fails_before_analysis() {
        let generator = ScriptedGenerator::reply("{}");
        let h = harness(generator.clone());
        let id = seed(&h, b"GIF89a not a resume".to_vec()).await;

        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(err, PipelineError::UnsupportedFormat(_)));
        assert!(generator.prompts().is_empty());
        assert_eq!(h.jobs.get(id).unwrap().status(), Some(ProcessingStatus::Failed));
    }

    #[tokio::test]
    async fn test_missing_object_is_retrieval_error() {
        let h = harness(ScriptedGenerator::reply("{}"));
        let id = h.jobs.create_pending(USER, PATH).await.unwrap().unwrap().id;

        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(err, PipelineError::Retrieval(_)));
        let row = h.jobs.get(id).unwrap();
        assert_eq!(row.status(), Some(ProcessingStatus::Failed));
        assert!(row.processing_error.unwrap().starts_with("Failed to retrieve CV file"));
    }

    #[tokio::test]
    async fn test_sparse_document_still_completes() {
        let h = harness(ScriptedGenerator::reply("{\"personal_info\": {}}"));
        let id = seed(&h, sample_pdf("")).await;

        let outcome = h.orchestrator.process(USER, PATH).await.unwrap();
        assert!((outcome.profile.match_score - 0.5).abs() < f64::EPSILON);
        assert_eq!(h.jobs.get(id).unwrap().status(), Some(ProcessingStatus::Completed));
    }

    #[tokio::test]
    async fn test_second_invocation_is_rejected() {
        let h = harness(ScriptedGenerator::reply("{}"));
        let id = seed(&h, sample_pdf("Jane Doe")).await;

        h.orchestrator.process(USER, PATH).await.unwrap();
        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::AlreadyClaimed { ref status, .. } if status == "completed"
        ));
        // The terminal record is untouched.
        assert_eq!(h.jobs.get(id).unwrap().status(), Some(ProcessingStatus::Completed));
        assert_eq!(h.jobs.history(id).len(), 3);
    }

    #[tokio::test]
    async fn test_extraction_leaves_runtime_free() {
        let h = harness(ScriptedGenerator::reply("{}"));
        let mut pdf = b"%PDF-1.4\n".to_vec();
        pdf.extend(std::iter::repeat(b'(').take(2 * 1024 * 1024));
        pdf.extend_from_slice(b" (Jane Doe, Research Engineer) Tj");
        let id = seed(&h, pdf).await;

        // Single-threaded runtime: other tasks only advance if extraction is off-thread.
        let mut ticks = 0u32;
        let process = h.orchestrator.process(USER, PATH);
        tokio::pin!(process);
        let outcome = loop {
            tokio::select! {
                result = &mut process => break result,
                _ = tokio::task::yield_now() => ticks += 1,
            }
        };

        assert!(outcome.is_ok());
        assert!(ticks > 0);
        assert_eq!(h.jobs.get(id).unwrap().status(), Some(ProcessingStatus::Completed));
    }

    #[tokio::test]
    async fn test_unknown_job_is_not_found() {
        let h = harness(ScriptedGenerator::reply("{}"));
        let err = h.orchestrator.process(USER, "user-1/cv_missing.pdf").await.unwrap_err();
        assert!(matches!(err, PipelineError::JobNotFound(_)));
    }

    #[tokio::test]
    async fn test_failure_write_error_keeps_stage_error() {
        let h = harness(ScriptedGenerator::reply("not json"));
        let id = seed(&h, sample_pdf("Jane Doe")).await;
        h.jobs.fail_terminal_writes(true);

        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidResponse(_)));
        // The failure could not be recorded; the job is left processing for the sweeper.
        assert_eq!(h.jobs.get(id).unwrap().status(), Some(ProcessingStatus::Processing));
    }

    #[tokio::test]
    async fn test_completion_write_error_marks_failed_without_profile() {
        let h = harness(ScriptedGenerator::reply("{\"match_score\": 0.9}"));
        let id = seed(&h, sample_pdf("Jane Doe")).await;
        h.jobs.fail_completion_writes(true);

        let err = h.orchestrator.process(USER, PATH).await.unwrap_err();
        assert!(matches!(err, PipelineError::Store(_)));
        let row = h.jobs.get(id).unwrap();
        assert_eq!(row.status(), Some(ProcessingStatus::Failed));
        assert!(row.match_score.is_none());
    }
}
