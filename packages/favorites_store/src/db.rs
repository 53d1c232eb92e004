use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use repo_core::StorageError;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tracing::info;

/// Current schema version - increment when adding migrations
pub const SCHEMA_VERSION: i64 = 1;

pub(crate) fn backend(e: sqlx::Error) -> StorageError {
    match e {
        sqlx::Error::PoolClosed => StorageError::Closed,
        other => StorageError::Backend(other.to_string()),
    }
}

fn migration(e: sqlx::Error) -> StorageError {
    StorageError::Migration(e.to_string())
}

/// Open (creating if needed) the database file at `path`.
pub(crate) async fn open_file(path: &Path) -> Result<SqlitePool, StorageError> {
    info!("Connecting to favorites database: {}", path.display());

    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .pragma("temp_store", "MEMORY")
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .max_connections(5)
        .min_connections(1)
        .connect_with(options)
        .await
        .map_err(backend)
}

/// Open a database by sqlx URL, e.g. `sqlite://favorites.db?mode=rwc`.
pub(crate) async fn open_url(url: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::from_str(url).map_err(backend)?;
    SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .map_err(backend)
}

/// A private in-memory database. The single connection is never recycled so
/// the data lives as long as the pool.
pub(crate) async fn open_memory() -> Result<SqlitePool, StorageError> {
    SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .map_err(backend)
}

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch()),
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(migration)?;

    let current_version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .map_err(migration)?;

    if current_version > SCHEMA_VERSION {
        return Err(StorageError::Migration(format!(
            "database schema version {} is newer than supported version {}",
            current_version, SCHEMA_VERSION
        )));
    }

    if current_version == SCHEMA_VERSION {
        info!("Favorites schema is up to date (version {})", current_version);
        return Ok(());
    }

    info!(
        "Migrating favorites database from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    // saved_at is unix milliseconds so ORDER BY sorts chronologically
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS favorites (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            name_with_owner TEXT NOT NULL,
            owner_login TEXT NOT NULL,
            owner_avatar_url TEXT,
            description TEXT,
            stargazer_count INTEGER NOT NULL DEFAULT 0,
            fork_count INTEGER NOT NULL DEFAULT 0,
            language TEXT,
            language_color TEXT,
            url TEXT NOT NULL,
            saved_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(migration)?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_favorites_saved_at ON favorites(saved_at DESC)")
        .execute(pool)
        .await
        .map_err(migration)?;

    sqlx::query("INSERT OR REPLACE INTO schema_version (version, description) VALUES (?, ?)")
        .bind(SCHEMA_VERSION)
        .bind("favorites table")
        .execute(pool)
        .await
        .map_err(migration)?;
    info!("Favorites schema upgraded to version {}", SCHEMA_VERSION);

    Ok(())
}
