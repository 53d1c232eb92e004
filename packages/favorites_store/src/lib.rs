//! SQLite-backed favorites store.
//!
//! [`SqliteFavoritesStore`] implements [`repo_core::FavoritesStore`] on top of
//! a `sqlx` pool. Every successful write bumps an in-process change counter;
//! subscriptions re-query the table whenever it moves.

mod db;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use repo_core::{FavoriteRecord, FavoritesStore, SnapshotStream, StorageError, snapshot_stream};
use sqlx::sqlite::SqlitePool;
use tokio::sync::watch;
use tracing::debug;

pub use db::{SCHEMA_VERSION, run_migrations};

use db::backend;

const SELECT_COLUMNS: &str = "SELECT id, name, name_with_owner, owner_login, owner_avatar_url, \
     description, stargazer_count, fork_count, language, language_color, url, saved_at \
     FROM favorites";

#[derive(sqlx::FromRow)]
struct FavoriteRow {
    id: String,
    name: String,
    name_with_owner: String,
    owner_login: String,
    owner_avatar_url: Option<String>,
    description: Option<String>,
    stargazer_count: i64,
    fork_count: i64,
    language: Option<String>,
    language_color: Option<String>,
    url: String,
    saved_at: i64,
}

impl TryFrom<FavoriteRow> for FavoriteRecord {
    type Error = StorageError;

    fn try_from(row: FavoriteRow) -> Result<Self, Self::Error> {
        let saved_at = DateTime::<Utc>::from_timestamp_millis(row.saved_at)
            .ok_or_else(|| StorageError::Corrupt(format!("{}: bad saved_at", row.id)))?;
        let count = |value: i64, field: &str| {
            u32::try_from(value)
                .map_err(|_| StorageError::Corrupt(format!("{}: bad {}", row.id, field)))
        };
        Ok(FavoriteRecord {
            star_count: count(row.stargazer_count, "stargazer_count")?,
            fork_count: count(row.fork_count, "fork_count")?,
            id: row.id,
            name: row.name,
            owner_login: row.owner_login,
            name_with_owner: row.name_with_owner,
            description: row.description,
            language: row.language,
            language_color: row.language_color,
            owner_avatar_url: row.owner_avatar_url,
            url: row.url,
            saved_at,
        })
    }
}

/// Favorites persisted in a SQLite database.
#[derive(Clone)]
pub struct SqliteFavoritesStore {
    pool: SqlitePool,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteFavoritesStore {
    /// Open the database file at `path`, creating it and its schema if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let pool = db::open_file(path.as_ref()).await?;
        Self::with_pool(pool).await
    }

    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let pool = db::open_url(url).await?;
        Self::with_pool(pool).await
    }

    /// A fresh database that disappears with the store.
    pub async fn in_memory() -> Result<Self, StorageError> {
        let pool = db::open_memory().await?;
        Self::with_pool(pool).await
    }

    /// Wrap an existing pool, applying migrations first.
    pub async fn with_pool(pool: SqlitePool) -> Result<Self, StorageError> {
        run_migrations(&pool).await?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            pool,
            changes: Arc::new(changes),
        })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the pool. Later operations fail with [`StorageError::Closed`].
    pub async fn close(&self) {
        self.pool.close().await;
    }

    fn notify(&self) {
        self.changes.send_modify(|version| *version += 1);
    }

    async fn listing(pool: &SqlitePool) -> Result<Vec<FavoriteRecord>, StorageError> {
        let rows = sqlx::query_as::<_, FavoriteRow>(&format!(
            "{SELECT_COLUMNS} ORDER BY saved_at DESC, id ASC"
        ))
        .fetch_all(pool)
        .await
        .map_err(backend)?;
        rows.into_iter().map(FavoriteRecord::try_from).collect()
    }

    async fn row_count(pool: &SqlitePool) -> Result<u64, StorageError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites")
            .fetch_one(pool)
            .await
            .map_err(backend)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl FavoritesStore for SqliteFavoritesStore {
    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        Self::listing(&self.pool).await
    }

    fn subscribe_all(&self) -> SnapshotStream<Vec<FavoriteRecord>> {
        let pool = self.pool.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            let pool = pool.clone();
            async move { Self::listing(&pool).await }
        })
    }

    async fn get(&self, id: &str) -> Result<Option<FavoriteRecord>, StorageError> {
        let row = sqlx::query_as::<_, FavoriteRow>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        row.map(FavoriteRecord::try_from).transpose()
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM favorites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        Ok(found.is_some())
    }

    async fn upsert(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO favorites (
                id, name, name_with_owner, owner_login, owner_avatar_url, description,
                stargazer_count, fork_count, language, language_color, url, saved_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                name_with_owner = excluded.name_with_owner,
                owner_login = excluded.owner_login,
                owner_avatar_url = excluded.owner_avatar_url,
                description = excluded.description,
                stargazer_count = excluded.stargazer_count,
                fork_count = excluded.fork_count,
                language = excluded.language,
                language_color = excluded.language_color,
                url = excluded.url,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.name)
        .bind(&record.name_with_owner)
        .bind(&record.owner_login)
        .bind(&record.owner_avatar_url)
        .bind(&record.description)
        .bind(i64::from(record.star_count))
        .bind(i64::from(record.fork_count))
        .bind(&record.language)
        .bind(&record.language_color)
        .bind(&record.url)
        .bind(record.saved_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        debug!("saved favorite {}", record.name_with_owner);
        self.notify();
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM favorites WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() > 0 {
            debug!("deleted favorite {}", id);
            self.notify();
        }
        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM favorites")
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        debug!("deleted {} favorites", result.rows_affected());
        self.notify();
        Ok(())
    }

    async fn count(&self) -> Result<u64, StorageError> {
        Self::row_count(&self.pool).await
    }

    fn subscribe_count(&self) -> SnapshotStream<u64> {
        let pool = self.pool.clone();
        snapshot_stream(self.changes.subscribe(), move || {
            let pool = pool.clone();
            async move { Self::row_count(&pool).await }
        })
    }
}
