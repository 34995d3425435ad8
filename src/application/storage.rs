//! Artifact persistence: the store seam and the uploader built on it.

use std::{
    io,
    path::{Component, Path},
    sync::Arc,
    time::Instant,
};

use async_trait::async_trait;
use bytes::Bytes;
use metrics::counter;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::entities::Artifact;
use crate::domain::types::SchedulingKey;

pub const METRIC_ARTIFACT_UPLOADS_TOTAL: &str = "pressroom_artifact_uploads_total";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid storage key `{0}`")]
    InvalidKey(String),
    #[error("artifact `{0}` not found")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("object store responded with {status}: {body}")]
    Remote { status: u16, body: String },
    #[error("object store request failed: {0}")]
    Transport(String),
}

/// Durable blob storage addressed by key. `put` is an upsert.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Stable public URL for `key`; resolving it does not contact the store.
    fn public_url(&self, key: &str) -> String;
}

/// Reject keys that are empty, absolute, or that walk out of the store root.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    let path = Path::new(key);
    let escapes = key.is_empty()
        || key.contains('\\')
        || path.is_absolute()
        || path.components().any(|component| {
            matches!(
                component,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
    if escapes {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("refusing to upload an empty artifact")]
    EmptyPayload,
    #[error("artifact upload failed: {0}")]
    Store(#[from] StorageError),
}

/// Uploads rendered bytes under the scheduling key's deterministic artifact key.
#[derive(Clone)]
pub struct ArtifactUploader {
    store: Arc<dyn ArtifactStore>,
}

impl ArtifactUploader {
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }

    pub async fn upload(
        &self,
        scheduling_key: &SchedulingKey,
        bytes: Bytes,
    ) -> Result<Artifact, UploadError> {
        if bytes.is_empty() {
            counter!(METRIC_ARTIFACT_UPLOADS_TOTAL, "result" => "empty").increment(1);
            return Err(UploadError::EmptyPayload);
        }

        let started_at = Instant::now();
        let storage_key = scheduling_key.artifact_key();
        let checksum = hex::encode(Sha256::digest(&bytes));
        let size_bytes = bytes.len() as u64;

        if let Err(err) = self.store.put(&storage_key, bytes).await {
            counter!(METRIC_ARTIFACT_UPLOADS_TOTAL, "result" => "error").increment(1);
            warn!(
                target = "application::storage",
                op = "artifact::upload",
                result = "error",
                elapsed_ms = started_at.elapsed().as_millis() as u64,
                storage_key = %storage_key,
                error = %err,
                "Artifact upload failed"
            );
            return Err(UploadError::Store(err));
        }

        let public_url = self.store.public_url(&storage_key);
        counter!(METRIC_ARTIFACT_UPLOADS_TOTAL, "result" => "ok").increment(1);
        info!(
            target = "application::storage",
            op = "artifact::upload",
            result = "ok",
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            storage_key = %storage_key,
            size_bytes,
            "Artifact stored"
        );

        Ok(Artifact {
            storage_key,
            public_url,
            checksum,
            size_bytes,
        })
    }
}
