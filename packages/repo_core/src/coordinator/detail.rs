use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Phase;
use super::favorites::FavoritesCoordinator;
use crate::gateway::DetailGateway;
use crate::models::RepositoryDetails;

/// Observable state of the detail screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    pub details: Option<RepositoryDetails>,
    pub loading: bool,
    pub error: Option<String>,
    /// Membership read when `details` was committed, updated by toggles
    pub is_favorite: bool,
}

impl DetailState {
    pub fn phase(&self) -> Phase {
        if self.loading {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.details.is_some() {
            Phase::Loaded
        } else {
            Phase::Idle
        }
    }
}

/// Loads one repository's details and tracks whether it is a favorite.
pub struct DetailCoordinator {
    gateway: Arc<dyn DetailGateway>,
    favorites: Arc<FavoritesCoordinator>,
    state: watch::Sender<DetailState>,
    /// Token of the load in flight; swapped and committed under this lock
    current: Mutex<CancellationToken>,
    shutdown: CancellationToken,
}

impl DetailCoordinator {
    pub fn new(gateway: Arc<dyn DetailGateway>, favorites: Arc<FavoritesCoordinator>) -> Self {
        let shutdown = CancellationToken::new();
        let (state, _) = watch::channel(DetailState::default());
        Self {
            gateway,
            favorites,
            state,
            current: Mutex::new(shutdown.child_token()),
            shutdown,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> DetailState {
        self.state.borrow().clone()
    }

    /// Fetch `owner/name`, superseding any load still in flight.
    ///
    /// Prior details stay visible until the new load commits. On failure they
    /// are kept and the error is set.
    pub async fn load_details(&self, owner: &str, name: &str) {
        let token = {
            let mut current = self.current.lock().await;
            if self.shutdown.is_cancelled() {
                return;
            }
            current.cancel();
            *current = self.shutdown.child_token();
            self.state.send_modify(|s| {
                s.loading = true;
                s.error = None;
            });
            current.clone()
        };

        debug!("loading details for {}/{}", owner, name);
        let fetched = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            fetched = self.gateway.repository_details(owner, name) => fetched,
        };

        let details = match fetched {
            Ok(details) => details,
            Err(e) => {
                let _current = self.current.lock().await;
                if token.is_cancelled() {
                    return;
                }
                warn!("loading {}/{} failed: {}", owner, name, e);
                self.state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
                return;
            }
        };

        // Membership is read before commit so details and status land together.
        let membership = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            membership = self.favorites.is_favorite(&details.id) => membership,
        };

        let _current = self.current.lock().await;
        if token.is_cancelled() {
            debug!("discarding superseded details for {}/{}", owner, name);
            return;
        }
        info!("loaded details for {}", details.name_with_owner);
        self.state.send_modify(|s| {
            match membership {
                Ok(is_favorite) => s.is_favorite = is_favorite,
                Err(e) => {
                    warn!("favorite lookup for {} failed: {}", details.id, e);
                    s.is_favorite = false;
                    s.error = Some(e.to_string());
                }
            }
            s.details = Some(details);
            s.loading = false;
        });
    }

    /// Flip favorite status of the loaded repository. Does nothing before
    /// details are loaded.
    pub async fn toggle_favorite(&self) {
        let Some(details) = self.state.borrow().details.clone() else {
            return;
        };
        let summary = details.to_summary();
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            outcome = self.favorites.toggle(&summary) => outcome,
        };
        match outcome {
            Ok(is_favorite) => {
                debug!("{} favorite: {}", details.name_with_owner, is_favorite);
                self.state.send_modify(|s| {
                    if s.details.as_ref().is_some_and(|d| d.id == details.id) {
                        s.is_favorite = is_favorite;
                    }
                });
            }
            Err(e) => {
                warn!("favorite toggle for {} failed: {}", details.name_with_owner, e);
                self.state.send_modify(|s| s.error = Some(e.to_string()));
            }
        }
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Cancel any outstanding load. Nothing is committed afterwards.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for DetailCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use crate::store::{FavoritesStore, MemoryFavoritesStore};
    use crate::test_helpers::{FlakyStore, ScriptedDetailGateway, details, wait_for};

    fn coordinator(
        gateway: &Arc<ScriptedDetailGateway>,
    ) -> (DetailCoordinator, Arc<MemoryFavoritesStore>) {
        let store = Arc::new(MemoryFavoritesStore::new());
        let favorites = FavoritesCoordinator::new(store.clone());
        (DetailCoordinator::new(gateway.clone(), favorites), store)
    }

    #[tokio::test]
    async fn loads_details_with_membership() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_ok(details("R_1", "rust-lang", "rust"));
        let (detail, _store) = coordinator(&gateway);

        assert_eq!(detail.state().phase(), Phase::Idle);
        detail.load_details("rust-lang", "rust").await;

        let state = detail.state();
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(
            state.details.as_ref().map(|d| d.name_with_owner.as_str()),
            Some("rust-lang/rust")
        );
        assert!(!state.is_favorite);
        assert_eq!(
            gateway.calls(),
            vec![("rust-lang".to_string(), "rust".to_string())]
        );
    }

    #[tokio::test]
    async fn already_favorited_repository_loads_as_favorite() {
        let gateway = ScriptedDetailGateway::new();
        let loaded = details("R_1", "rust-lang", "rust");
        gateway.push_ok(loaded.clone());
        let (detail, store) = coordinator(&gateway);
        store
            .upsert(crate::test_helpers::favorite(&loaded.to_summary()))
            .await
            .unwrap();

        detail.load_details("rust-lang", "rust").await;

        assert!(detail.state().is_favorite);
    }

    #[tokio::test]
    async fn not_found_sets_error_without_details() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_err(RemoteError::NotFound {
            owner: "ghost".into(),
            name: "missing".into(),
        });
        let (detail, _store) = coordinator(&gateway);

        detail.load_details("ghost", "missing").await;

        let state = detail.state();
        assert!(state.details.is_none());
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("Repository not found: ghost/missing")
        );
        assert_eq!(state.phase(), Phase::Failed);
    }

    #[tokio::test]
    async fn failed_reload_keeps_previous_details() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_ok(details("R_1", "rust-lang", "rust"));
        gateway.push_err(RemoteError::Transport("timed out".into()));
        let (detail, _store) = coordinator(&gateway);

        detail.load_details("rust-lang", "rust").await;
        detail.load_details("rust-lang", "rust").await;

        let state = detail.state();
        assert!(state.details.is_some());
        assert_eq!(state.error.as_deref(), Some("Network error: timed out"));
    }

    #[tokio::test]
    async fn toggle_round_trip_updates_store_and_state() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_ok(details("R_1", "rust-lang", "rust"));
        let (detail, store) = coordinator(&gateway);

        detail.load_details("rust-lang", "rust").await;

        detail.toggle_favorite().await;
        assert!(detail.state().is_favorite);
        let saved = store.get("R_1").await.unwrap().unwrap();
        assert_eq!(saved.name_with_owner, "rust-lang/rust");
        assert_eq!(saved.language.as_deref(), Some("Rust"));

        detail.toggle_favorite().await;
        assert!(!detail.state().is_favorite);
        assert!(!store.exists("R_1").await.unwrap());
    }

    #[tokio::test]
    async fn toggle_without_details_is_noop() {
        let gateway = ScriptedDetailGateway::new();
        let (detail, store) = coordinator(&gateway);

        detail.toggle_favorite().await;

        assert_eq!(store.count().await.unwrap(), 0);
        assert_eq!(detail.state(), DetailState::default());
    }

    #[tokio::test]
    async fn failed_toggle_keeps_status_and_sets_error() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_ok(details("R_1", "rust-lang", "rust"));
        let store = Arc::new(FlakyStore::new());
        let favorites = FavoritesCoordinator::new(store.clone());
        let detail = DetailCoordinator::new(gateway.clone(), favorites);

        detail.load_details("rust-lang", "rust").await;
        store.fail_writes(true);
        detail.toggle_favorite().await;

        let state = detail.state();
        assert!(!state.is_favorite);
        assert!(state.error.is_some());
        assert!(state.details.is_some());
    }

    #[tokio::test]
    async fn membership_failure_still_shows_details() {
        let gateway = ScriptedDetailGateway::new();
        gateway.push_ok(details("R_1", "rust-lang", "rust"));
        let store = Arc::new(FlakyStore::new());
        store.fail_reads(true);
        let favorites = FavoritesCoordinator::new(store.clone());
        let detail = DetailCoordinator::new(gateway.clone(), favorites);

        detail.load_details("rust-lang", "rust").await;

        let state = detail.state();
        assert!(state.details.is_some());
        assert!(!state.is_favorite);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn newer_load_wins_over_slow_older_load() {
        let gateway = ScriptedDetailGateway::new();
        let slow = gateway.push_gated();
        gateway.push_ok(details("R_2", "tokio-rs", "tokio"));
        let (detail, _store) = coordinator(&gateway);

        let older = detail.load_details("rust-lang", "rust");
        let newer = async {
            let mut rx = detail.subscribe();
            wait_for(&mut rx, |s| s.loading).await;
            detail.load_details("tokio-rs", "tokio").await;
            let _ = slow.send(Ok(details("R_1", "rust-lang", "rust")));
        };
        tokio::join!(older, newer);

        let state = detail.state();
        assert_eq!(state.details.map(|d| d.id).as_deref(), Some("R_2"));
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn closed_coordinator_discards_pending_load() {
        let gateway = ScriptedDetailGateway::new();
        let pending = gateway.push_gated();
        let (detail, _store) = coordinator(&gateway);

        let running = detail.load_details("rust-lang", "rust");
        let teardown = async {
            let mut rx = detail.subscribe();
            wait_for(&mut rx, |s| s.loading).await;
            detail.close();
            let _ = pending.send(Ok(details("R_1", "rust-lang", "rust")));
        };
        tokio::join!(running, teardown);

        assert!(detail.state().details.is_none());
    }
}
