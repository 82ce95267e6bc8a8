//! Live query subscriptions.
//!
//! A publisher holds the latest full snapshot of one collection. Subscribers
//! see the current snapshot first and then one result per change; they never
//! see partial updates. Intermediate snapshots may be skipped if a subscriber
//! falls behind, which is fine because every push carries the whole set.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::Stream;
use tokio::sync::watch;

use crate::{
    domain::{sort_records, Collection, ContentRecord, SortOrder},
    error::{AppError, Result},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Snapshot {
    /// Nothing has been loaded yet.
    Pending,
    Ready(Arc<Vec<ContentRecord>>),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentQuery {
    pub collection: Collection,
    pub order: SortOrder,
}

impl ContentQuery {
    pub fn new(collection: Collection, order: SortOrder) -> Self {
        Self { collection, order }
    }

    /// The collection in its usual board order.
    pub fn ordered(collection: Collection) -> Self {
        Self::new(collection, collection.display_order())
    }

    fn apply(&self, records: &[ContentRecord]) -> Vec<ContentRecord> {
        let mut out = records.to_vec();
        sort_records(&mut out, self.order);
        out
    }
}

/// Anything that can hand out live subscriptions: the real store, or a test
/// double built on [`SnapshotPublisher`].
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    fn subscribe(&self, query: ContentQuery) -> Subscription;

    /// Re-read the collection from its backing storage and push the result.
    async fn reload(&self, _collection: Collection) {}
}

/// Publish side of one collection's live query.
pub struct SnapshotPublisher {
    tx: watch::Sender<Snapshot>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::Pending);
        Self { tx }
    }

    pub fn publish(&self, records: Vec<ContentRecord>) {
        self.tx.send_replace(Snapshot::Ready(Arc::new(records)));
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.tx.send_replace(Snapshot::Failed(message.into()));
    }

    pub fn current(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self, query: ContentQuery) -> Subscription {
        Subscription::new(query, self.tx.subscribe())
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// A lazy, restartable sequence of full-snapshot query results.
pub struct Subscription {
    query: ContentQuery,
    rx: watch::Receiver<Snapshot>,
}

impl Subscription {
    pub fn new(query: ContentQuery, mut rx: watch::Receiver<Snapshot>) -> Self {
        // The first `next` yields whatever is current.
        rx.mark_changed();
        Self { query, rx }
    }

    /// Waits for the next snapshot. Returns `None` once the publisher is gone
    /// and every published value has been seen.
    pub async fn next(&mut self) -> Option<Result<Vec<ContentRecord>>> {
        loop {
            if self.rx.changed().await.is_err() {
                return None;
            }
            let snapshot = self.rx.borrow_and_update().clone();
            if let Some(result) = self.resolve(snapshot) {
                return Some(result);
            }
        }
    }

    /// The latest snapshot without waiting, or `None` while still pending.
    pub fn current(&self) -> Option<Result<Vec<ContentRecord>>> {
        let snapshot = self.rx.borrow().clone();
        self.resolve(snapshot)
    }

    /// Makes the next call to [`Subscription::next`] yield the current
    /// snapshot again.
    pub fn restart(&mut self) {
        self.rx.mark_changed();
    }

    pub fn into_stream(self) -> impl Stream<Item = Result<Vec<ContentRecord>>> {
        futures_util::stream::unfold(self, |mut sub| async move {
            sub.next().await.map(|item| (item, sub))
        })
    }

    fn resolve(&self, snapshot: Snapshot) -> Option<Result<Vec<ContentRecord>>> {
        match snapshot {
            Snapshot::Pending => None,
            Snapshot::Ready(records) => Some(Ok(self.query.apply(&records))),
            Snapshot::Failed(message) => Some(Err(AppError::Subscription(message))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use futures_util::StreamExt;
    use uuid::Uuid;

    fn event(title: &str, day: u32) -> ContentRecord {
        let start = Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap();
        ContentRecord {
            id: Uuid::new_v4(),
            collection: Collection::Events,
            title: title.to_string(),
            content: "details".to_string(),
            start_date: start,
            end_date: start + chrono::Duration::hours(4),
            created_at: start,
            updated_at: start,
        }
    }

    fn titles(records: &[ContentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.title.as_str()).collect()
    }

    #[tokio::test]
    async fn first_next_yields_current_snapshot_in_query_order() {
        let publisher = SnapshotPublisher::new();
        publisher.publish(vec![event("later", 20), event("sooner", 10)]);

        let mut sub = publisher.subscribe(ContentQuery::ordered(Collection::Events));
        let records = sub.next().await.unwrap().unwrap();
        assert_eq!(titles(&records), vec!["sooner", "later"]);

        let mut desc = publisher.subscribe(ContentQuery::new(Collection::Events, SortOrder::StartDesc));
        let records = desc.next().await.unwrap().unwrap();
        assert_eq!(titles(&records), vec!["later", "sooner"]);
    }

    #[tokio::test]
    async fn pending_snapshots_are_skipped() {
        let publisher = Arc::new(SnapshotPublisher::new());
        let mut sub = publisher.subscribe(ContentQuery::ordered(Collection::Events));
        assert!(sub.current().is_none());

        let p = publisher.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            p.publish(vec![event("orientation", 3)]);
        });

        let records = sub.next().await.unwrap().unwrap();
        assert_eq!(titles(&records), vec!["orientation"]);
    }

    #[tokio::test]
    async fn failures_surface_as_subscription_errors() {
        let publisher = SnapshotPublisher::new();
        publisher.fail("permission denied");

        let mut sub = publisher.subscribe(ContentQuery::ordered(Collection::Events));
        let err = sub.next().await.unwrap().unwrap_err();
        assert_eq!(err, AppError::Subscription("permission denied".to_string()));
    }

    #[tokio::test]
    async fn restart_replays_the_current_snapshot() {
        let publisher = SnapshotPublisher::new();
        publisher.publish(vec![event("fair", 1)]);

        let mut sub = publisher.subscribe(ContentQuery::ordered(Collection::Events));
        assert_eq!(sub.next().await.unwrap().unwrap().len(), 1);

        sub.restart();
        let again = tokio::time::timeout(std::time::Duration::from_millis(100), sub.next())
            .await
            .expect("restart should make the snapshot available immediately");
        assert_eq!(titles(&again.unwrap().unwrap()), vec!["fair"]);
    }

    #[tokio::test]
    async fn stream_ends_when_publisher_is_dropped() {
        let publisher = SnapshotPublisher::new();
        publisher.publish(vec![event("a", 1)]);
        let sub = publisher.subscribe(ContentQuery::ordered(Collection::Events));
        publisher.publish(vec![event("a", 1), event("b", 2)]);
        drop(publisher);

        let results: Vec<_> = sub.into_stream().collect().await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].as_ref().unwrap().len(), 2);
    }
}
