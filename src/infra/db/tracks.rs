use crate::application::repos::{RepoError, WorkUnitsRepo};
use crate::domain::types::SchedulingKey;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait::async_trait]
impl WorkUnitsRepo for PostgresRepositories {
    async fn count_work_units(&self, key: &SchedulingKey) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks WHERE week_start = $1")
            .bind(key.as_str())
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        count
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }
}
