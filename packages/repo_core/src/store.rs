//! Local favorites storage: the store contract, live snapshot streams and an
//! in-memory implementation.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::BoxStream;
use tokio::sync::{RwLock, watch};

use crate::error::StorageError;
use crate::models::FavoriteRecord;

/// Live sequence of snapshots. Dropping the stream ends the subscription.
pub type SnapshotStream<T> = BoxStream<'static, Result<T, StorageError>>;

/// Durable keyed storage of favorited repositories.
///
/// Writes are atomic per record. Subscriptions deliver snapshots in write
/// order; a failed read is delivered as an `Err` item and later snapshots
/// still follow.
#[async_trait]
pub trait FavoritesStore: Send + Sync {
    /// All records, most recently saved first.
    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StorageError>;

    /// Current listing on subscription, then a fresh listing after every write.
    fn subscribe_all(&self) -> SnapshotStream<Vec<FavoriteRecord>>;

    async fn get(&self, id: &str) -> Result<Option<FavoriteRecord>, StorageError>;

    async fn exists(&self, id: &str) -> Result<bool, StorageError>;

    /// Insert, or overwrite the record with the same id.
    async fn upsert(&self, record: FavoriteRecord) -> Result<(), StorageError>;

    /// Deleting an absent id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StorageError>;

    async fn delete_all(&self) -> Result<(), StorageError>;

    async fn count(&self) -> Result<u64, StorageError>;

    fn subscribe_count(&self) -> SnapshotStream<u64>;
}

/// Build a cold snapshot stream driven by a store's change counter.
///
/// The first item is fetched immediately; every later item is fetched after the
/// counter moves. Bursts of writes may be coalesced into one snapshot, but the
/// last snapshot always reflects the latest write. The stream ends when the
/// counter's sender is dropped.
pub fn snapshot_stream<T, F, Fut>(changes: watch::Receiver<u64>, fetch: F) -> SnapshotStream<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, StorageError>> + Send + 'static,
{
    futures::stream::unfold(
        (changes, fetch, true),
        |(mut changes, fetch, first)| async move {
            if first {
                changes.borrow_and_update();
            } else if changes.changed().await.is_err() {
                return None;
            }
            let snapshot = fetch().await;
            Some((snapshot, (changes, fetch, false)))
        },
    )
    .boxed()
}

/// Listing order shared by every store: newest `saved_at` first, then id.
pub fn sort_for_listing(records: &mut [FavoriteRecord]) {
    records.sort_by(|a, b| b.saved_at.cmp(&a.saved_at).then_with(|| a.id.cmp(&b.id)));
}

/// Favorites kept in process memory. Nothing survives a restart.
#[derive(Clone)]
pub struct MemoryFavoritesStore {
    records: Arc<RwLock<HashMap<String, FavoriteRecord>>>,
    changes: Arc<watch::Sender<u64>>,
}

impl Default for MemoryFavoritesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFavoritesStore {
    pub fn new() -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
            changes: Arc::new(changes),
        }
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    async fn listing(records: &RwLock<HashMap<String, FavoriteRecord>>) -> Vec<FavoriteRecord> {
        let mut all: Vec<_> = records.read().await.values().cloned().collect();
        sort_for_listing(&mut all);
        all
    }
}

#[async_trait]
impl FavoritesStore for MemoryFavoritesStore {
    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        Ok(Self::listing(&self.records).await)
    }

    fn subscribe_all(&self) -> SnapshotStream<Vec<FavoriteRecord>> {
        let records = self.records.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            let records = records.clone();
            async move { Ok(Self::listing(&records).await) }
        })
    }

    async fn get(&self, id: &str) -> Result<Option<FavoriteRecord>, StorageError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        Ok(self.records.read().await.contains_key(id))
    }

    async fn upsert(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        self.records.write().await.insert(record.id.clone(), record);
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let removed = self.records.write().await.remove(id).is_some();
        if removed {
            self.notify();
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.records.write().await.clear();
        self.notify();
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Ok(self.records.read().await.len() as u64)
    }

    fn subscribe_count(&self) -> SnapshotStream<u64> {
        let records = self.records.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            let records = records.clone();
            async move { Ok(records.read().await.len() as u64) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{favorite, summary};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn upsert_overwrites_same_id() {
        let store = MemoryFavoritesStore::new();
        let mut first = favorite(&summary("R1", "alpha"));
        store.upsert(first.clone()).await.unwrap();

        first.star_count = 99;
        store.upsert(first.clone()).await.unwrap();

        let all = store.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].star_count, 99);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let store = MemoryFavoritesStore::new();
        let now = Utc::now();
        let older = FavoriteRecord::from_summary(&summary("R1", "old"), now - Duration::hours(1));
        let newer = FavoriteRecord::from_summary(&summary("R2", "new"), now);
        store.upsert(older).await.unwrap();
        store.upsert(newer).await.unwrap();

        let ids: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec!["R2", "R1"]);
    }

    #[tokio::test]
    async fn subscription_emits_current_then_each_change() {
        let store = MemoryFavoritesStore::new();
        let mut snapshots = store.subscribe_all();

        let initial = snapshots.next().await.unwrap().unwrap();
        assert!(initial.is_empty());

        store.upsert(favorite(&summary("R1", "alpha"))).await.unwrap();
        let added = snapshots.next().await.unwrap().unwrap();
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, "R1");

        store.delete("R1").await.unwrap();
        let removed = snapshots.next().await.unwrap().unwrap();
        assert!(removed.is_empty());
    }

    #[tokio::test]
    async fn late_subscriber_sees_existing_records() {
        let store = MemoryFavoritesStore::new();
        store.upsert(favorite(&summary("R1", "alpha"))).await.unwrap();

        let mut snapshots = store.subscribe_all();
        let first = snapshots.next().await.unwrap().unwrap();
        assert_eq!(first.len(), 1);
    }

    #[tokio::test]
    async fn count_subscription_tracks_writes() {
        let store = MemoryFavoritesStore::new();
        let mut counts = store.subscribe_count();
        assert_eq!(counts.next().await.unwrap().unwrap(), 0);

        store.upsert(favorite(&summary("R1", "alpha"))).await.unwrap();
        assert_eq!(counts.next().await.unwrap().unwrap(), 1);

        store.delete_all().await.unwrap();
        assert_eq!(counts.next().await.unwrap().unwrap(), 0);
    }

    #[tokio::test]
    async fn deleting_missing_id_is_ok() {
        let store = MemoryFavoritesStore::new();
        store.delete("missing").await.unwrap();
        assert!(!store.exists("missing").await.unwrap());
        assert!(store.get("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_fetch_does_not_end_stream() {
        let (tx, rx) = watch::channel(0u64);
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let counter = calls.clone();
        let mut stream = snapshot_stream(rx, move || {
            let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            async move {
                if n == 1 {
                    Err(StorageError::Backend("locked".into()))
                } else {
                    Ok(n)
                }
            }
        });

        assert_eq!(stream.next().await.unwrap().unwrap(), 0);
        tx.send_modify(|v| *v += 1);
        assert!(stream.next().await.unwrap().is_err());
        tx.send_modify(|v| *v += 1);
        assert_eq!(stream.next().await.unwrap().unwrap(), 2);

        drop(tx);
        assert!(stream.next().await.is_none());
    }
}
