use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode, Url, header};

use crate::application::storage::{ArtifactStore, StorageError, validate_key};

const OBJECT_PREFIX: &str = "storage/v1/object";

/// Object storage reached over HTTP: authenticated upserts, public reads.
#[derive(Debug, Clone)]
pub struct RemoteArtifactStore {
    client: Client,
    base_url: Url,
    bucket: String,
    api_key: String,
}

impl RemoteArtifactStore {
    pub fn new(client: Client, base_url: Url, bucket: String, api_key: String) -> Self {
        Self {
            client,
            base_url,
            bucket,
            api_key,
        }
    }

    fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    fn upload_url(&self, key: &str) -> String {
        format!("{}/{OBJECT_PREFIX}/{}/{key}", self.base(), self.bucket)
    }
}

#[async_trait]
impl ArtifactStore for RemoteArtifactStore {
    async fn put(&self, key: &str, bytes: Bytes) -> Result<(), StorageError> {
        validate_key(key)?;

        let response = self
            .client
            .post(self.upload_url(key))
            .bearer_auth(&self.api_key)
            .header("x-upsert", "true")
            .header(header::CONTENT_TYPE, "image/png")
            .header(header::CACHE_CONTROL, "max-age=0")
            .body(bytes)
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));
            return Err(StorageError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        validate_key(key)?;

        let response = self
            .client
            .get(self.public_url(key))
            .send()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|err| format!("<failed to read response body: {err}>"));
            return Err(StorageError::Remote {
                status: status.as_u16(),
                body,
            });
        }
        response
            .bytes()
            .await
            .map_err(|err| StorageError::Transport(err.to_string()))
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{OBJECT_PREFIX}/public/{}/{key}", self.base(), self.bucket)
    }
}
