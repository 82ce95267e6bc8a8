//! The content store: single-document writes against the repository, and a
//! live snapshot of each collection pushed to subscribers after every change.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    domain::{Collection, ContentPayload, ContentRecord, SortOrder},
    error::Result,
    repository::ContentRepository,
};

pub mod subscription;

pub use subscription::{ContentQuery, Snapshot, SnapshotPublisher, SnapshotSource, Subscription};

struct LiveCollection {
    publisher: SnapshotPublisher,
    // Serializes read-then-publish so an older read never overwrites a newer one.
    reload_lock: Mutex<()>,
}

impl LiveCollection {
    fn new() -> Self {
        Self {
            publisher: SnapshotPublisher::new(),
            reload_lock: Mutex::new(()),
        }
    }
}

pub struct ContentStore {
    repo: Arc<dyn ContentRepository>,
    announcements: LiveCollection,
    events: LiveCollection,
}

impl ContentStore {
    pub fn new(repo: Arc<dyn ContentRepository>) -> Self {
        Self {
            repo,
            announcements: LiveCollection::new(),
            events: LiveCollection::new(),
        }
    }

    fn live(&self, collection: Collection) -> &LiveCollection {
        match collection {
            Collection::Announcements => &self.announcements,
            Collection::Events => &self.events,
        }
    }

    /// Re-reads a collection and pushes the full result to its subscribers.
    /// A failed read is pushed as a failed snapshot.
    pub async fn reload(&self, collection: Collection) {
        let live = self.live(collection);
        let _guard = live.reload_lock.lock().await;

        match self.repo.list(collection, collection.display_order()).await {
            Ok(records) => {
                tracing::debug!(
                    collection = %collection,
                    count = records.len(),
                    subscribers = live.publisher.subscriber_count(),
                    "publishing snapshot"
                );
                live.publisher.publish(records);
            }
            Err(e) => {
                tracing::error!(collection = %collection, error = %e, "snapshot query failed");
                live.publisher.fail(e.to_string());
            }
        }
    }

    pub async fn reload_all(&self) {
        for collection in Collection::ALL {
            self.reload(collection).await;
        }
    }

    pub async fn create(&self, collection: Collection, payload: ContentPayload) -> Result<ContentRecord> {
        let record = self.repo.create(collection, payload).await?;
        tracing::info!(collection = %collection, id = %record.id, title = %record.title, "content created");
        self.reload(collection).await;
        Ok(record)
    }

    pub async fn update(
        &self,
        collection: Collection,
        id: Uuid,
        payload: ContentPayload,
    ) -> Result<ContentRecord> {
        let record = self.repo.update(collection, id, payload).await?;
        tracing::info!(collection = %collection, %id, "content updated");
        self.reload(collection).await;
        Ok(record)
    }

    /// Deleting an id that is already gone is a no-op; the return value says
    /// whether anything was removed.
    pub async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool> {
        let removed = self.repo.delete(collection, id).await?;
        if removed {
            tracing::info!(collection = %collection, %id, "content deleted");
            self.reload(collection).await;
        } else {
            tracing::debug!(collection = %collection, %id, "delete of absent content ignored");
        }
        Ok(removed)
    }

    pub async fn find(&self, collection: Collection, id: Uuid) -> Result<Option<ContentRecord>> {
        self.repo.find_by_id(collection, id).await
    }

    pub async fn list(&self, collection: Collection, order: SortOrder) -> Result<Vec<ContentRecord>> {
        self.repo.list(collection, order).await
    }

    pub async fn list_started(
        &self,
        collection: Collection,
        at: DateTime<Utc>,
        order: SortOrder,
    ) -> Result<Vec<ContentRecord>> {
        self.repo.list_started(collection, at, order).await
    }

    pub fn snapshot(&self, collection: Collection) -> Snapshot {
        self.live(collection).publisher.current()
    }
}

#[async_trait]
impl SnapshotSource for ContentStore {
    fn subscribe(&self, query: ContentQuery) -> Subscription {
        self.live(query.collection).publisher.subscribe(query)
    }

    async fn reload(&self, collection: Collection) {
        ContentStore::reload(self, collection).await
    }
}
