//! Remote read capabilities consumed by the coordinators.

use async_trait::async_trait;

use crate::error::RemoteError;
use crate::models::{RepositoryDetails, SearchPage};

/// Paginated repository search.
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Fetch one page of results. `cursor` is the `end_cursor` of the previous
    /// page, or `None` for the first page.
    async fn search_repositories(
        &self,
        query: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<SearchPage, RemoteError>;
}

/// Full details for a single repository.
#[async_trait]
pub trait DetailGateway: Send + Sync {
    /// Fails with [`RemoteError::NotFound`] when the repository does not exist.
    async fn repository_details(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryDetails, RemoteError>;
}
