use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use pressroom::application::publish::{PublishError, publish_due};
use pressroom::application::repos::{ContentRepo, RepoError};
use pressroom::domain::entities::ContentItem;
use time::{Duration, OffsetDateTime, macros::datetime};
use tokio::sync::Mutex;
use uuid::Uuid;

/// In-memory content table whose batch commit is all-or-nothing.
#[derive(Default)]
struct InMemoryContent {
    items: Mutex<BTreeMap<Uuid, ContentItem>>,
    fail_commit: bool,
    commits: AtomicUsize,
}

impl InMemoryContent {
    fn failing() -> Self {
        Self {
            fail_commit: true,
            ..Default::default()
        }
    }

    async fn insert(&self, scheduled_for: Option<OffsetDateTime>) -> Uuid {
        let id = Uuid::new_v4();
        self.items.lock().await.insert(
            id,
            ContentItem {
                id,
                payload: serde_json::json!({ "title": format!("item {id}") }),
                scheduled_for,
                is_published: false,
                published_at: None,
            },
        );
        id
    }

    async fn get(&self, id: Uuid) -> ContentItem {
        self.items.lock().await.get(&id).cloned().expect("item exists")
    }
}

#[async_trait]
impl ContentRepo for InMemoryContent {
    async fn list_unpublished(&self) -> Result<Vec<ContentItem>, RepoError> {
        Ok(self
            .items
            .lock()
            .await
            .values()
            .filter(|item| !item.is_published)
            .cloned()
            .collect())
    }

    async fn publish_batch(
        &self,
        ids: &[Uuid],
        published_at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        if self.fail_commit {
            return Err(RepoError::from_persistence("connection reset during commit"));
        }

        let mut items = self.items.lock().await;
        let mut changed = 0;
        for id in ids {
            let Some(item) = items.get_mut(id) else {
                continue;
            };
            if item.is_due(published_at) {
                item.is_published = true;
                item.published_at = Some(published_at);
                changed += 1;
            }
        }
        Ok(changed)
    }
}

const NOW: OffsetDateTime = datetime!(2025-11-07 12:00 UTC);

#[tokio::test]
async fn publishes_due_items_once() {
    let repo = InMemoryContent::default();
    let past = repo.insert(Some(NOW - Duration::hours(1))).await;
    let exact = repo.insert(Some(NOW)).await;

    let summary = publish_due(&repo, NOW)
        .await
        .expect("publish succeeds")
        .expect("items were due");
    assert_eq!(summary.published_count, 2);

    for id in [past, exact] {
        let item = repo.get(id).await;
        assert!(item.is_published);
        assert_eq!(item.published_at, Some(NOW));
    }

    let second = publish_due(&repo, NOW).await.expect("second run succeeds");
    assert!(second.is_none(), "nothing left to publish");
    assert_eq!(repo.commits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn future_and_unscheduled_items_are_untouched() {
    let repo = InMemoryContent::default();
    let future = repo.insert(Some(NOW + Duration::minutes(5))).await;
    let unscheduled = repo.insert(None).await;

    let result = publish_due(&repo, NOW).await.expect("publish succeeds");
    assert!(result.is_none());
    assert_eq!(repo.commits.load(Ordering::SeqCst), 0, "no writes when nothing is due");

    for id in [future, unscheduled] {
        let item = repo.get(id).await;
        assert!(!item.is_published);
        assert!(item.published_at.is_none());
    }
}

#[tokio::test]
async fn failed_commit_leaves_batch_unpublished() {
    let repo = InMemoryContent::failing();
    let first = repo.insert(Some(NOW - Duration::days(1))).await;
    let second = repo.insert(Some(NOW - Duration::minutes(1))).await;

    let err = publish_due(&repo, NOW)
        .await
        .expect_err("commit failure surfaces");
    match err {
        PublishError::Commit { candidates, .. } => assert_eq!(candidates, 2),
        other => panic!("unexpected error: {other:?}"),
    }

    for id in [first, second] {
        assert!(!repo.get(id).await.is_published);
    }
}

#[tokio::test]
async fn overlapping_runs_publish_each_item_at_most_once() {
    let repo = InMemoryContent::default();
    for offset in 1..=5 {
        repo.insert(Some(NOW - Duration::minutes(offset))).await;
    }

    let (a, b) = tokio::join!(publish_due(&repo, NOW), publish_due(&repo, NOW));
    let total: u64 = [a, b]
        .into_iter()
        .map(|result| result.expect("run succeeds").map_or(0, |s| s.published_count))
        .sum();
    assert_eq!(total, 5);
}

/// Serves a listing taken before another run committed, as an overlapping run would see it.
struct StaleListing {
    inner: InMemoryContent,
    listing: Vec<ContentItem>,
}

#[async_trait]
impl ContentRepo for StaleListing {
    async fn list_unpublished(&self) -> Result<Vec<ContentItem>, RepoError> {
        Ok(self.listing.clone())
    }

    async fn publish_batch(
        &self,
        ids: &[Uuid],
        published_at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        self.inner.publish_batch(ids, published_at).await
    }
}

#[tokio::test]
async fn run_losing_the_race_reports_nothing_published() {
    let inner = InMemoryContent::default();
    inner.insert(Some(NOW - Duration::minutes(3))).await;
    inner.insert(Some(NOW - Duration::minutes(2))).await;
    let listing = inner.list_unpublished().await.expect("listing");

    let first = publish_due(&inner, NOW)
        .await
        .expect("first run succeeds")
        .expect("items were due");
    assert_eq!(first.published_count, 2);

    let stale = StaleListing { inner, listing };
    let second = publish_due(&stale, NOW).await.expect("second run succeeds");
    assert!(second.is_none(), "zero transitioned rows is not a publish");
    assert_eq!(stale.inner.commits.load(Ordering::SeqCst), 2);
}
