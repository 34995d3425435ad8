use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{ContentRepo, RepoError};
use crate::domain::entities::ContentItem;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(Debug, sqlx::FromRow)]
struct ContentItemRow {
    id: Uuid,
    payload: serde_json::Value,
    scheduled_for: Option<OffsetDateTime>,
    is_published: bool,
    published_at: Option<OffsetDateTime>,
}

impl From<ContentItemRow> for ContentItem {
    fn from(row: ContentItemRow) -> Self {
        ContentItem {
            id: row.id,
            payload: row.payload,
            scheduled_for: row.scheduled_for,
            is_published: row.is_published,
            published_at: row.published_at,
        }
    }
}

#[async_trait::async_trait]
impl ContentRepo for PostgresRepositories {
    async fn list_unpublished(&self) -> Result<Vec<ContentItem>, RepoError> {
        let rows = sqlx::query_as::<_, ContentItemRow>(
            r#"
            SELECT id, payload, scheduled_for, is_published, published_at
            FROM content_items
            WHERE is_published = FALSE
            ORDER BY scheduled_for NULLS LAST, id
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContentItem::from).collect())
    }

    async fn publish_batch(
        &self,
        ids: &[Uuid],
        published_at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let mut tx = self.begin().await.map_err(map_sqlx_error)?;

        let result = sqlx::query(
            r#"
            UPDATE content_items
            SET is_published = TRUE, published_at = $2
            WHERE id = ANY($1)
              AND is_published = FALSE
              AND scheduled_for IS NOT NULL
              AND scheduled_for <= $2
            "#,
        )
        .bind(ids)
        .bind(published_at)
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
