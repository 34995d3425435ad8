use std::io::{self, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;

use crate::application::storage::{ArtifactStore, StorageError, validate_key};

/// Artifact storage rooted at a local directory.
///
/// Writes land in a temporary file next to the target and are renamed into
/// place, so readers never observe a partially written artifact.
#[derive(Debug, Clone)]
pub struct FilesystemArtifactStore {
    root: PathBuf,
    public_base: String,
}

impl FilesystemArtifactStore {
    /// Create the store, creating `root` if it does not exist yet.
    pub fn new(root: PathBuf, public_base: impl Into<String>) -> Result<Self, io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_base: public_base.into(),
        })
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ArtifactStore for FilesystemArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        let target = self.resolve(key)?;
        let parent = target
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        fs::create_dir_all(&parent).await?;

        tokio::task::spawn_blocking(move || -> Result<(), io::Error> {
            let mut staged = tempfile::Builder::new()
                .prefix(".artifact-")
                .tempfile_in(&parent)?;
            staged.write_all(&bytes)?;
            staged.as_file().sync_all()?;
            staged.persist(&target).map_err(|err| err.error)?;
            Ok(())
        })
        .await
        .map_err(io::Error::other)??;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(err) => Err(StorageError::Io(err)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base.trim_end_matches('/'), key)
    }
}
