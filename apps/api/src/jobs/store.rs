//! Job Record Store: one `cv_analyses` row per (user, document path).
//!
//! Every status write is a conditional UPDATE on the expected prior status, so
//! concurrent invocations can't both claim a job and a terminal result is
//! never overwritten.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::analysis::{AnalysisJobRow, ProcessingStatus};
use crate::models::profile::StructuredProfile;

#[derive(Debug, Error)]
pub enum JobStoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Illegal status transition {from} -> {to}")]
    IllegalTransition {
        from: ProcessingStatus,
        to: ProcessingStatus,
    },
}

/// Status literals for a conditional write, checked against the lifecycle.
pub fn transition(
    from: ProcessingStatus,
    to: ProcessingStatus,
) -> Result<(&'static str, &'static str), JobStoreError> {
    if from.can_transition_to(to) {
        Ok((from.as_str(), to.as_str()))
    } else {
        Err(JobStoreError::IllegalTransition { from, to })
    }
}

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Inserts a `pending` job. Returns `None` when the pair already has one.
    async fn create_pending(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError>;

    async fn find(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError>;

    /// `pending → processing`. Returns `None` when the job is missing or not pending.
    async fn claim(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError>;

    /// `processing → completed` with the full profile. Returns whether the row changed.
    async fn complete(
        &self,
        id: Uuid,
        profile: &StructuredProfile,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, JobStoreError>;

    /// `processing → failed` with an error message. Returns whether the row changed.
    async fn fail(&self, id: Uuid, message: &str) -> Result<bool, JobStoreError>;

    /// Fails every job that has been `processing` since before `cutoff`.
    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<AnalysisJobRow>, JobStoreError>;
}

#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create_pending(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        Ok(sqlx::query_as::<_, AnalysisJobRow>(
            r#"
            INSERT INTO cv_analyses (id, user_id, cv_file_path, processing_status)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, cv_file_path) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(cv_file_path)
        .bind(ProcessingStatus::Pending.as_str())
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        Ok(sqlx::query_as::<_, AnalysisJobRow>(
            "SELECT * FROM cv_analyses WHERE user_id = $1 AND cv_file_path = $2",
        )
        .bind(user_id)
        .bind(cv_file_path)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn claim(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        let (from, to) = transition(ProcessingStatus::Pending, ProcessingStatus::Processing)?;
        Ok(sqlx::query_as::<_, AnalysisJobRow>(
            r#"
            UPDATE cv_analyses
            SET processing_status = $4, updated_at = now()
            WHERE user_id = $1 AND cv_file_path = $2 AND processing_status = $3
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(cv_file_path)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn complete(
        &self,
        id: Uuid,
        profile: &StructuredProfile,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, JobStoreError> {
        let (from, to) = transition(ProcessingStatus::Processing, ProcessingStatus::Completed)?;
        let result = sqlx::query(
            r#"
            UPDATE cv_analyses
            SET processing_status = $13,
                personal_info = $2,
                education = $3,
                work_experience = $4,
                skills = $5,
                research = $6,
                achievements = $7,
                strengths = $8,
                areas_for_improvement = $9,
                match_score = $10,
                processed_at = $11,
                processing_error = NULL,
                updated_at = now()
            WHERE id = $1 AND processing_status = $12
            "#,
        )
        .bind(id)
        .bind(Json(&profile.personal_info))
        .bind(Json(&profile.education))
        .bind(Json(&profile.work_experience))
        .bind(Json(&profile.skills))
        .bind(Json(&profile.research))
        .bind(Json(&profile.achievements))
        .bind(profile.strengths.as_slice())
        .bind(profile.areas_for_improvement.as_slice())
        .bind(profile.match_score)
        .bind(processed_at)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail(&self, id: Uuid, message: &str) -> Result<bool, JobStoreError> {
        let (from, to) = transition(ProcessingStatus::Processing, ProcessingStatus::Failed)?;
        let result = sqlx::query(
            r#"
            UPDATE cv_analyses
            SET processing_status = $4, processing_error = $2, updated_at = now()
            WHERE id = $1 AND processing_status = $3
            "#,
        )
        .bind(id)
        .bind(message)
        .bind(from)
        .bind(to)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<AnalysisJobRow>, JobStoreError> {
        let (from, to) = transition(ProcessingStatus::Processing, ProcessingStatus::Failed)?;
        Ok(sqlx::query_as::<_, AnalysisJobRow>(
            r#"
            UPDATE cv_analyses
            SET processing_status = $4, processing_error = $2, updated_at = now()
            WHERE processing_status = $3 AND updated_at < $1
            RETURNING *
            "#,
        )
        .bind(cutoff)
        .bind(message)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?)
    }
}
