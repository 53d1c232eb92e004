//! Repo Core - state coordination for a GitHub repository browser
//!
//! This crate holds the screen-level logic of the browser with no HTTP or
//! database dependencies: remote reads go through [`SearchGateway`] and
//! [`DetailGateway`], local favorites through [`FavoritesStore`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use repo_core::{FavoritesCoordinator, MemoryFavoritesStore, SearchCoordinator, SearchGateway};
//!
//! async fn run(gateway: Arc<dyn SearchGateway>) {
//!     let favorites = FavoritesCoordinator::new(Arc::new(MemoryFavoritesStore::new()));
//!     let search = SearchCoordinator::new(gateway, favorites);
//!
//!     search.set_query("kotlin");
//!     search.search().await;
//!     if search.state().has_more {
//!         search.load_more().await;
//!     }
//!     println!("{} results", search.state().results.len());
//! }
//! ```

pub mod coordinator;
pub mod error;
pub mod format;
pub mod gateway;
pub mod models;
pub mod store;

#[cfg(test)]
mod test_helpers;

pub use coordinator::{
    DEFAULT_PAGE_SIZE, DetailCoordinator, DetailState, FavoritesCoordinator, FavoritesState,
    Phase, SearchCoordinator, SearchState,
};
pub use error::{RemoteError, StorageError};
pub use gateway::{DetailGateway, SearchGateway};
pub use models::{
    FavoriteRecord, LanguageBreakdown, LanguageShare, PrimaryLanguage, RepositoryDetails,
    RepositorySummary, SearchPage,
};
pub use store::{FavoritesStore, MemoryFavoritesStore, SnapshotStream, snapshot_stream, sort_for_listing};
