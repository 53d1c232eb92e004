use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::Phase;
use super::favorites::FavoritesCoordinator;
use crate::gateway::SearchGateway;
use crate::models::RepositorySummary;

/// Results requested per page.
pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Observable state of the search screen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// Text as typed; only read when a search starts
    pub query: String,
    /// Accumulated results of the current search, unique by id
    pub results: Vec<RepositorySummary>,
    pub loading: bool,
    pub loading_more: bool,
    pub error: Option<String>,
    pub has_more: bool,
    /// Cursor for the next page, passed back to the gateway untouched
    pub end_cursor: Option<String>,
    /// Trimmed query that produced `results`
    pub active_query: Option<String>,
}

impl SearchState {
    pub fn phase(&self) -> Phase {
        if self.loading || self.loading_more {
            Phase::Loading
        } else if self.error.is_some() {
            Phase::Failed
        } else if self.active_query.is_some() {
            Phase::Loaded
        } else {
            Phase::Idle
        }
    }
}

/// Tokens for the two operation categories; each is a child of the root token.
struct InFlight {
    search: CancellationToken,
    load_more: CancellationToken,
}

/// Query text, paginated result accumulation and favorite status for the
/// search screen.
pub struct SearchCoordinator {
    gateway: Arc<dyn SearchGateway>,
    favorites: Arc<FavoritesCoordinator>,
    page_size: usize,
    state: watch::Sender<SearchState>,
    /// Held while starting an operation and while committing its result
    inflight: Mutex<InFlight>,
    shutdown: CancellationToken,
}

impl SearchCoordinator {
    pub fn new(gateway: Arc<dyn SearchGateway>, favorites: Arc<FavoritesCoordinator>) -> Self {
        Self::with_page_size(gateway, favorites, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(
        gateway: Arc<dyn SearchGateway>,
        favorites: Arc<FavoritesCoordinator>,
        page_size: usize,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let (state, _) = watch::channel(SearchState::default());
        Self {
            gateway,
            favorites,
            page_size: page_size.max(1),
            state,
            inflight: Mutex::new(InFlight {
                search: shutdown.child_token(),
                load_more: shutdown.child_token(),
            }),
            shutdown,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Replace the held query text. Does not fetch.
    pub fn set_query(&self, text: impl Into<String>) {
        let text = text.into();
        self.state.send_modify(|s| s.query = text);
    }

    /// Start a fresh search for the held query, superseding any search or
    /// load-more still in flight. A blank query does nothing.
    pub async fn search(&self) {
        let query = self.state.borrow().query.trim().to_string();
        if query.is_empty() {
            debug!("ignoring search for blank query");
            return;
        }

        let token = {
            let mut inflight = self.inflight.lock().await;
            if self.shutdown.is_cancelled() {
                return;
            }
            inflight.search.cancel();
            inflight.load_more.cancel();
            inflight.search = self.shutdown.child_token();
            self.state.send_modify(|s| {
                s.loading = true;
                s.loading_more = false;
                s.error = None;
                s.results.clear();
                s.has_more = false;
                s.end_cursor = None;
                s.active_query = Some(query.clone());
            });
            inflight.search.clone()
        };

        debug!("searching for {:?}", query);
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            outcome = self.gateway.search_repositories(&query, self.page_size, None) => outcome,
        };

        let _inflight = self.inflight.lock().await;
        if token.is_cancelled() {
            debug!("discarding superseded search for {:?}", query);
            return;
        }
        match outcome {
            Ok(page) => {
                info!(
                    "search {:?}: {} results, has_more={}",
                    query,
                    page.items.len(),
                    page.has_more
                );
                self.state.send_modify(|s| {
                    merge_by_id(&mut s.results, page.items);
                    s.has_more = page.has_more;
                    s.end_cursor = page.end_cursor;
                    s.loading = false;
                });
            }
            Err(e) => {
                warn!("search {:?} failed: {}", query, e);
                self.state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading = false;
                });
            }
        }
    }

    /// Append the next page of the current search.
    ///
    /// Does nothing while another page is loading, after the last page, or
    /// when the held query is blank.
    pub async fn load_more(&self) {
        let (token, query, cursor) = {
            let mut inflight = self.inflight.lock().await;
            if self.shutdown.is_cancelled() {
                return;
            }
            let claim = {
                let s = self.state.borrow();
                if s.loading || s.loading_more || !s.has_more || s.query.trim().is_empty() {
                    None
                } else {
                    s.active_query
                        .clone()
                        .map(|query| (query, s.end_cursor.clone()))
                }
            };
            let Some((query, cursor)) = claim else {
                return;
            };
            inflight.load_more = self.shutdown.child_token();
            self.state.send_modify(|s| s.loading_more = true);
            (inflight.load_more.clone(), query, cursor)
        };

        debug!("loading more for {:?} after {:?}", query, cursor);
        let outcome = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            outcome = self.gateway.search_repositories(&query, self.page_size, cursor.as_deref()) => outcome,
        };

        let _inflight = self.inflight.lock().await;
        if token.is_cancelled() {
            return;
        }
        match outcome {
            Ok(page) => {
                debug!(
                    "page for {:?}: {} results, has_more={}",
                    query,
                    page.items.len(),
                    page.has_more
                );
                self.state.send_modify(|s| {
                    merge_by_id(&mut s.results, page.items);
                    s.has_more = page.has_more;
                    s.end_cursor = page.end_cursor;
                    s.loading_more = false;
                });
            }
            Err(e) => {
                warn!("loading more for {:?} failed: {}", query, e);
                self.state.send_modify(|s| {
                    s.error = Some(e.to_string());
                    s.loading_more = false;
                });
            }
        }
    }

    /// Flip favorite status through the favorites coordinator. The displayed
    /// status follows the favorites subscription, not this call.
    pub async fn toggle_favorite(&self, repo: &RepositorySummary) {
        let outcome = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return,
            outcome = self.favorites.toggle(repo) => outcome,
        };
        if let Err(e) = outcome {
            warn!("favorite toggle for {} failed: {}", repo.name_with_owner, e);
            self.state.send_modify(|s| s.error = Some(e.to_string()));
        }
    }

    /// Favorite status of every current result, keyed by repository id.
    pub fn favorite_status(&self) -> HashMap<String, bool> {
        let favorite_ids = self.favorites.favorite_ids();
        self.state
            .borrow()
            .results
            .iter()
            .map(|r| (r.id.clone(), favorite_ids.contains(&r.id)))
            .collect()
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.favorites.favorite_ids().contains(id)
    }

    pub fn clear_error(&self) {
        self.state.send_modify(|s| s.error = None);
    }

    /// Cancel every outstanding operation. Nothing is committed afterwards.
    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Append `incoming`, replacing in place any result whose id is already present.
fn merge_by_id(results: &mut Vec<RepositorySummary>, incoming: Vec<RepositorySummary>) {
    let mut positions: HashMap<String, usize> = results
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();
    for repo in incoming {
        match positions.get(&repo.id) {
            Some(&i) => results[i] = repo,
            None => {
                positions.insert(repo.id.clone(), results.len());
                results.push(repo);
            }
        }
    }
}
