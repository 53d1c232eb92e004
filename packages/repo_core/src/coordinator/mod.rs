//! Observable state holders, one per screen.
//!
//! Each coordinator publishes its state through a `tokio::sync::watch`
//! channel and exposes `async` operations that mutate it. Operations of the
//! same category supersede each other: starting a new one cancels the token
//! of the previous one, and results are only committed while the operation's
//! token is still live. Closing (or dropping) a coordinator cancels every
//! outstanding operation.

mod detail;
mod favorites;
mod search;

pub use detail::{DetailCoordinator, DetailState};
pub use favorites::{FavoritesCoordinator, FavoritesState};
pub use search::{DEFAULT_PAGE_SIZE, SearchCoordinator, SearchState};

/// Coarse lifecycle of a pull-driven coordinator.
///
/// `Loaded` and `Failed` both allow re-entering `Loading` on the next call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed,
}
