//! In-memory collaborators for unit and route tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::analysis::StructuredAnalysisClient;
use crate::config::Config;
use crate::jobs::orchestrator::Orchestrator;
use crate::jobs::store::{self, JobStore, JobStoreError};
use crate::llm_client::{LlmError, TextGenerator};
use crate::models::analysis::{AnalysisJobRow, ProcessingStatus};
use crate::models::profile::StructuredProfile;
use crate::state::AppState;
use crate::storage::{ObjectStore, StorageError};

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Bytes>>,
    fail_uploads: AtomicBool,
}

impl MemoryObjectStore {
    pub fn insert(&self, path: &str, bytes: Bytes) {
        self.objects.lock().unwrap().insert(path.to_string(), bytes);
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(path).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.fail_uploads.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, path: &str, bytes: Bytes, _content_type: &str) -> Result<(), StorageError> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::Upload {
                path: path.to_string(),
                message: "bucket unavailable".to_string(),
            });
        }
        self.insert(path, bytes);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        match self.get(path) {
            Some(bytes) if bytes.is_empty() => Err(StorageError::Empty(path.to_string())),
            Some(bytes) => Ok(bytes),
            None => Err(StorageError::Download {
                path: path.to_string(),
                message: "NoSuchKey".to_string(),
            }),
        }
    }
}

/// Job store over a map, recording every status each job passes through.
#[derive(Default)]
pub struct MemoryJobStore {
    rows: Mutex<HashMap<Uuid, AnalysisJobRow>>,
    history: Mutex<HashMap<Uuid, Vec<ProcessingStatus>>>,
    fail_terminal_writes: AtomicBool,
    fail_completion_writes: AtomicBool,
}

impl MemoryJobStore {
    pub fn get(&self, id: Uuid) -> Option<AnalysisJobRow> {
        self.rows.lock().unwrap().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }

    pub fn history(&self, id: Uuid) -> Vec<ProcessingStatus> {
        self.history.lock().unwrap().get(&id).cloned().unwrap_or_default()
    }

    /// Makes both `complete` and `fail` return a database error.
    pub fn fail_terminal_writes(&self, fail: bool) {
        self.fail_terminal_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes only `complete` return a database error.
    pub fn fail_completion_writes(&self, fail: bool) {
        self.fail_completion_writes.store(fail, Ordering::SeqCst);
    }

    pub fn backdate(&self, id: Uuid, by: chrono::Duration) {
        if let Some(row) = self.rows.lock().unwrap().get_mut(&id) {
            row.updated_at = row.updated_at - by;
        }
    }

    /// Applies `next` after the same lifecycle check the Postgres store runs.
    fn transition(&self, row: &mut AnalysisJobRow, next: ProcessingStatus) -> Result<(), JobStoreError> {
        let current = row.status().expect("memory rows hold known statuses");
        store::transition(current, next)?;
        row.processing_status = next.as_str().to_string();
        row.updated_at = Utc::now();
        self.history
            .lock()
            .unwrap()
            .entry(row.id)
            .or_default()
            .push(next);
        Ok(())
    }

    fn write_error() -> JobStoreError {
        JobStoreError::Database(sqlx::Error::PoolTimedOut)
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create_pending(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        if self.find(user_id, cv_file_path).await?.is_some() {
            return Ok(None);
        }
        let row = AnalysisJobRow::pending(user_id, cv_file_path);
        self.history
            .lock()
            .unwrap()
            .insert(row.id, vec![ProcessingStatus::Pending]);
        self.rows.lock().unwrap().insert(row.id, row.clone());
        Ok(Some(row))
    }

    async fn find(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .find(|row| row.user_id == user_id && row.cv_file_path == cv_file_path)
            .cloned())
    }

    async fn claim(
        &self,
        user_id: &str,
        cv_file_path: &str,
    ) -> Result<Option<AnalysisJobRow>, JobStoreError> {
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows.values_mut().find(|row| {
            row.user_id == user_id
                && row.cv_file_path == cv_file_path
                && row.status() == Some(ProcessingStatus::Pending)
        }) else {
            return Ok(None);
        };
        self.transition(row, ProcessingStatus::Processing)?;
        Ok(Some(row.clone()))
    }

    async fn complete(
        &self,
        id: Uuid,
        profile: &StructuredProfile,
        processed_at: DateTime<Utc>,
    ) -> Result<bool, JobStoreError> {
        if self.fail_terminal_writes.load(Ordering::SeqCst)
            || self.fail_completion_writes.load(Ordering::SeqCst)
        {
            return Err(Self::write_error());
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .get_mut(&id)
            .filter(|row| row.status() == Some(ProcessingStatus::Processing))
        else {
            return Ok(false);
        };
        row.personal_info = serde_json::to_value(&profile.personal_info).ok();
        row.education = serde_json::to_value(&profile.education).ok();
        row.work_experience = serde_json::to_value(&profile.work_experience).ok();
        row.skills = serde_json::to_value(&profile.skills).ok();
        row.research = serde_json::to_value(&profile.research).ok();
        row.achievements = serde_json::to_value(&profile.achievements).ok();
        row.strengths = Some(profile.strengths.clone());
        row.areas_for_improvement = Some(profile.areas_for_improvement.clone());
        row.match_score = Some(profile.match_score);
        row.processed_at = Some(processed_at);
        row.processing_error = None;
        self.transition(row, ProcessingStatus::Completed)?;
        Ok(true)
    }

    async fn fail(&self, id: Uuid, message: &str) -> Result<bool, JobStoreError> {
        if self.fail_terminal_writes.load(Ordering::SeqCst) {
            return Err(Self::write_error());
        }
        let mut rows = self.rows.lock().unwrap();
        let Some(row) = rows
            .get_mut(&id)
            .filter(|row| row.status() == Some(ProcessingStatus::Processing))
        else {
            return Ok(false);
        };
        row.processing_error = Some(message.to_string());
        self.transition(row, ProcessingStatus::Failed)?;
        Ok(true)
    }

    async fn fail_stale(
        &self,
        cutoff: DateTime<Utc>,
        message: &str,
    ) -> Result<Vec<AnalysisJobRow>, JobStoreError> {
        let mut rows = self.rows.lock().unwrap();
        let mut swept = Vec::new();
        for row in rows.values_mut() {
            if row.status() == Some(ProcessingStatus::Processing) && row.updated_at < cutoff {
                row.processing_error = Some(message.to_string());
                self.transition(row, ProcessingStatus::Failed)?;
                swept.push(row.clone());
            }
        }
        Ok(swept)
    }
}

/// Replies with a fixed text (or fails) and records every prompt it receives.
#[derive(Clone)]
pub struct ScriptedGenerator {
    reply: Option<String>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn reply(text: &str) -> Self {
        Self {
            reply: Some(text.to_string()),
            prompts: Arc::default(),
        }
    }

    /// Every call fails with `LlmError::EmptyContent`.
    pub fn fail() -> Self {
        Self {
            reply: None,
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply.clone().ok_or(LlmError::EmptyContent)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://localhost/cv_test".to_string(),
        s3_bucket: "cvs".to_string(),
        s3_endpoint: "http://localhost:9000".to_string(),
        aws_access_key_id: "test".to_string(),
        aws_secret_access_key: "test".to_string(),
        gemini_api_key: "test".to_string(),
        gemini_model: "gemini-1.5-flash".to_string(),
        llm_timeout_secs: 5,
        stale_job_minutes: 30,
        sweep_interval_secs: 0,
        port: 0,
        rust_log: "debug".to_string(),
    }
}

pub struct TestApp {
    pub state: AppState,
    pub storage: Arc<MemoryObjectStore>,
    pub jobs: Arc<MemoryJobStore>,
    pub generator: ScriptedGenerator,
}

pub fn test_app(generator: ScriptedGenerator) -> TestApp {
    let storage = Arc::new(MemoryObjectStore::default());
    let jobs = Arc::new(MemoryJobStore::default());
    let orchestrator = Orchestrator::new(
        storage.clone(),
        jobs.clone(),
        StructuredAnalysisClient::new(Arc::new(generator.clone())),
    );
    let state = AppState {
        config: test_config(),
        storage: storage.clone(),
        jobs: jobs.clone(),
        orchestrator,
    };
    TestApp {
        state,
        storage,
        jobs,
        generator,
    }
}

/// A single-page PDF whose content stream shows `text`, padded past the
/// minimum upload size.
pub fn sample_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 12 Tf 72 712 Td ({text}) Tj ET");
    let mut pdf = format!(
        "%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n\
         4 0 obj\n<< /Length {} >>\nstream\n{}\nendstream\nendobj\n",
        content.len(),
        content
    )
    .into_bytes();
    while pdf.len() < 1100 {
        pdf.extend_from_slice(b"%                                       \n");
    }
    pdf.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n%%EOF\n");
    pdf
}
