//! Failure taxonomy for the remote gateways and the local favorites store.

/// Failures reported by the remote search and detail gateways.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("Repository not found: {owner}/{name}")]
    NotFound { owner: String, name: String },

    /// Application-level errors reported alongside (or instead of) data
    #[error("GraphQL error: {}", .0.join(", "))]
    GraphQl(Vec<String>),

    #[error("No data returned from GitHub API")]
    NoData,

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Network error: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl RemoteError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Failures reported by a favorites store.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("storage failure: {0}")]
    Backend(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("corrupt favorite record: {0}")]
    Corrupt(String),

    #[error("store is closed")]
    Closed,
}
