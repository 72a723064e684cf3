//! Object Store Adapter: raw CV bytes in, storage path out.
//!
//! Paths follow `{user_id}/cv_{timestamp_ms}.{ext}` inside the CV bucket and
//! are the only handle later stages use to reach the document.

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload of '{path}' failed: {message}")]
    Upload { path: String, message: String },

    #[error("Download of '{path}' failed: {message}")]
    Download { path: String, message: String },

    #[error("Object '{0}' is empty")]
    Empty(String),
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError>;

    /// Fails with `StorageError::Empty` for zero-length objects.
    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;
}

/// Deterministic storage key for a user's CV upload.
pub fn cv_object_path(user_id: &str, uploaded_at: DateTime<Utc>, extension: &str) -> String {
    format!("{user_id}/cv_{}.{extension}", uploaded_at.timestamp_millis())
}

/// S3 / MinIO-backed store for the CV bucket.
#[derive(Clone)]
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn upload(&self, path: &str, bytes: Bytes, content_type: &str) -> Result<(), StorageError> {
        let size = bytes.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(path)
            .body(ByteStream::from(bytes))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::Upload {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        info!("Uploaded {size} bytes to s3://{}/{}", self.bucket, path);
        Ok(())
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let object = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(path)
            .send()
            .await
            .map_err(|e| StorageError::Download {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let bytes = object
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Download {
                path: path.to_string(),
                message: e.to_string(),
            })?
            .into_bytes();

        if bytes.is_empty() {
            return Err(StorageError::Empty(path.to_string()));
        }
        Ok(bytes)
    }
}
