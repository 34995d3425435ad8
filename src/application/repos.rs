//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::ContentItem;
use crate::domain::types::SchedulingKey;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

#[async_trait]
pub trait ContentRepo: Send + Sync {
    /// Every item whose `is_published` flag is still false, scheduled or not.
    async fn list_unpublished(&self) -> Result<Vec<ContentItem>, RepoError>;

    /// Publish the given items in one transaction and return how many rows changed.
    ///
    /// Implementations must only transition rows that are still unpublished and
    /// scheduled at or before `published_at`; either every such row commits or none do.
    async fn publish_batch(
        &self,
        ids: &[Uuid],
        published_at: OffsetDateTime,
    ) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait WorkUnitsRepo: Send + Sync {
    async fn count_work_units(&self, key: &SchedulingKey) -> Result<u64, RepoError>;
}
