use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::StorageError;
use crate::models::{FavoriteRecord, RepositorySummary};
use crate::store::FavoritesStore;

/// Observable state of the favorites screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FavoritesState {
    /// Latest snapshot emitted by the store
    pub favorites: Vec<FavoriteRecord>,
    /// True until the first snapshot arrives
    pub loading: bool,
    /// True while the store subscription is open
    pub subscribed: bool,
    pub error: Option<String>,
}

impl FavoritesState {
    pub fn is_empty(&self) -> bool {
        self.favorites.is_empty()
    }
}

/// Mirrors the favorites store and owns every favorite write.
///
/// The displayed list is whatever the store subscription emitted last; writes
/// never patch it locally.
pub struct FavoritesCoordinator {
    store: Arc<dyn FavoritesStore>,
    state: Arc<watch::Sender<FavoritesState>>,
    shutdown: CancellationToken,
}

impl FavoritesCoordinator {
    /// Open the store subscription. Must be called inside a tokio runtime.
    pub fn new(store: Arc<dyn FavoritesStore>) -> Arc<Self> {
        let (state, _) = watch::channel(FavoritesState {
            loading: true,
            subscribed: true,
            ..Default::default()
        });
        let coordinator = Arc::new(Self {
            store,
            state: Arc::new(state),
            shutdown: CancellationToken::new(),
        });
        coordinator.spawn_subscription();
        coordinator
    }

    fn spawn_subscription(&self) {
        let mut snapshots = self.store.subscribe_all();
        let state = self.state.clone();
        let cancel = self.shutdown.child_token();

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    next = snapshots.next() => next,
                };
                match next {
                    Some(Ok(favorites)) => {
                        debug!("favorites snapshot: {} records", favorites.len());
                        state.send_modify(|s| {
                            s.favorites = favorites;
                            s.loading = false;
                        });
                    }
                    Some(Err(e)) => {
                        warn!("favorites subscription error: {}", e);
                        state.send_modify(|s| {
                            s.error = Some(e.to_string());
                            s.loading = false;
                        });
                    }
                    None => break,
                }
            }
            debug!("favorites subscription ended");
            state.send_modify(|s| {
                s.subscribed = false;
                s.loading = false;
            });
        });
    }

    pub fn subscribe(&self) -> watch::Receiver<FavoritesState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> FavoritesState {
        self.state.borrow().clone()
    }

    pub fn favorites(&self) -> Vec<FavoriteRecord> {
        self.state.borrow().favorites.clone()
    }

    /// Ids in the latest snapshot, for per-row lookups.
    pub fn favorite_ids(&self) -> HashSet<String> {
        self.state
            .borrow()
            .favorites
            .iter()
            .map(|f| f.id.clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.borrow().favorites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.borrow().is_empty()
    }

    /// Point-in-time membership read against the store, bypassing the snapshot.
    pub async fn is_favorite(&self, id: &str) -> Result<bool, StorageError> {
        self.store.exists(id).await
    }

    /// Flip membership of `repo` and return the new membership.
    ///
    /// Favoriting again after a removal stores fresh metadata. Errors are
    /// returned to the caller and not recorded in this coordinator's state.
    pub async fn toggle(&self, repo: &RepositorySummary) -> Result<bool, StorageError> {
        if self.store.exists(&repo.id).await? {
            self.store.delete(&repo.id).await?;
            debug!("removed favorite {}", repo.name_with_owner);
            Ok(false)
        } else {
            self.store
                .upsert(FavoriteRecord::from_summary(repo, Utc::now()))
                .await?;
            debug!("added favorite {}", repo.name_with_owner);
            Ok(true)
        }
    }

    /// Like [`toggle`](Self::toggle), but failures land in the error slot.
    /// Returns `None` when the toggle failed or the coordinator was closed.
    pub async fn toggle_favorite(&self, repo: &RepositorySummary) -> Option<bool> {
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return None,
            outcome = self.toggle(repo) => outcome,
        };
        match outcome {
            Ok(is_favorite) => Some(is_favorite),
            Err(e) => {
                self.record_error(e);
                None
            }
        }
    }

    pub async fn remove_favorite(&self, repo: &RepositorySummary) -> bool {
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            outcome = self.store.delete(&repo.id) => outcome,
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                self.record_error(e);
                false
            }
        }
    }

    pub async fn clear_all(&self) -> bool {
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            outcome = self.store.delete_all() => outcome,
        };
        match outcome {
            Ok(()) => true,
            Err(e) => {
                self.record_error(e);
                false
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Cancel outstanding operations and close the store subscription.
    pub fn close(&self) {
        self.shutdown.cancel();
        self.state.send_modify(|s| {
            s.subscribed = false;
            s.loading = false;
        });
    }

    pub fn is_closed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn record_error(&self, e: StorageError) {
        if self.shutdown.is_cancelled() {
            return;
        }
        warn!("favorites operation failed: {}", e);
        self.state.send_modify(|s| s.error = Some(e.to_string()));
    }
}

impl Drop for FavoritesCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
