use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of an analysis job. Transitions only move forward:
/// `pending → processing → {completed | failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Pending => "pending",
            ProcessingStatus::Processing => "processing",
            ProcessingStatus::Completed => "completed",
            ProcessingStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Completed | ProcessingStatus::Failed)
    }

    /// The only legal edges of the status machine.
    pub fn can_transition_to(&self, next: ProcessingStatus) -> bool {
        matches!(
            (self, next),
            (ProcessingStatus::Pending, ProcessingStatus::Processing)
                | (ProcessingStatus::Processing, ProcessingStatus::Completed)
                | (ProcessingStatus::Processing, ProcessingStatus::Failed)
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProcessingStatus::Pending),
            "processing" => Ok(ProcessingStatus::Processing),
            "completed" => Ok(ProcessingStatus::Completed),
            "failed" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown processing status '{other}'")),
        }
    }
}

/// One row of `cv_analyses`. Profile columns stay `NULL` until the job completes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisJobRow {
    pub id: Uuid,
    pub user_id: String,
    pub cv_file_path: String,
    pub processing_status: String,
    pub personal_info: Option<Value>,
    pub education: Option<Value>,
    pub work_experience: Option<Value>,
    pub skills: Option<Value>,
    pub research: Option<Value>,
    pub achievements: Option<Value>,
    pub strengths: Option<Vec<String>>,
    pub areas_for_improvement: Option<Vec<String>>,
    pub match_score: Option<f64>,
    pub processed_at: Option<DateTime<Utc>>,
    pub processing_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AnalysisJobRow {
    /// A fresh `pending` record for a just-uploaded document.
    pub fn pending(user_id: &str, cv_file_path: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            cv_file_path: cv_file_path.to_string(),
            processing_status: ProcessingStatus::Pending.as_str().to_string(),
            personal_info: None,
            education: None,
            work_experience: None,
            skills: None,
            research: None,
            achievements: None,
            strengths: None,
            areas_for_improvement: None,
            match_score: None,
            processed_at: None,
            processing_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn status(&self) -> Option<ProcessingStatus> {
        self.processing_status.parse().ok()
    }
}
