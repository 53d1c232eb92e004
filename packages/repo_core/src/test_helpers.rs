//! Fixtures and scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use tokio::sync::{oneshot, watch};

use crate::error::{RemoteError, StorageError};
use crate::gateway::{DetailGateway, SearchGateway};
use crate::models::{
    FavoriteRecord, LanguageBreakdown, PrimaryLanguage, RepositoryDetails, RepositorySummary,
    SearchPage,
};
use crate::store::{FavoritesStore, MemoryFavoritesStore, SnapshotStream};

pub fn summary(id: &str, name: &str) -> RepositorySummary {
    RepositorySummary {
        id: id.to_string(),
        name: name.to_string(),
        owner_login: "octocat".to_string(),
        name_with_owner: format!("octocat/{name}"),
        description: Some(format!("{name} repository")),
        star_count: 42,
        fork_count: 7,
        primary_language: Some(PrimaryLanguage {
            name: "Kotlin".to_string(),
            color: Some("#A97BFF".to_string()),
        }),
        owner_avatar_url: None,
        url: format!("https://github.com/octocat/{name}"),
    }
}

pub fn favorite(summary: &RepositorySummary) -> FavoriteRecord {
    FavoriteRecord::from_summary(summary, Utc::now())
}

/// A page whose items are named `{prefix}{i}` for each `i` in `ids`.
pub fn page(prefix: &str, ids: Range<usize>, has_more: bool, cursor: Option<&str>) -> SearchPage {
    SearchPage {
        items: ids
            .map(|i| summary(&format!("{prefix}{i}"), &format!("{prefix}-repo-{i}")))
            .collect(),
        has_more,
        end_cursor: cursor.map(str::to_string),
    }
}

pub fn details(id: &str, owner: &str, name: &str) -> RepositoryDetails {
    RepositoryDetails {
        id: id.to_string(),
        name: name.to_string(),
        owner_login: owner.to_string(),
        name_with_owner: format!("{owner}/{name}"),
        description: None,
        star_count: 1500,
        fork_count: 80,
        watcher_count: 30,
        open_issue_count: 5,
        open_pull_request_count: 1,
        primary_language: Some(PrimaryLanguage {
            name: "Rust".to_string(),
            color: Some("#dea584".to_string()),
        }),
        license: Some("MIT License".to_string()),
        created_at: "2020-01-15T10:00:00Z".to_string(),
        updated_at: "2024-06-01T12:00:00Z".to_string(),
        url: format!("https://github.com/{owner}/{name}"),
        homepage_url: None,
        owner_avatar_url: None,
        languages: vec![
            LanguageBreakdown {
                name: "Rust".to_string(),
                color: Some("#dea584".to_string()),
                byte_size: 900,
            },
            LanguageBreakdown {
                name: "Shell".to_string(),
                color: None,
                byte_size: 100,
            },
        ],
    }
}

/// Wait until `pred` holds for the channel value, failing the test after two seconds.
pub async fn wait_for<T: Clone>(rx: &mut watch::Receiver<T>, pred: impl FnMut(&T) -> bool) -> T {
    match tokio::time::timeout(Duration::from_secs(2), rx.wait_for(pred)).await {
        Ok(Ok(value)) => value.clone(),
        Ok(Err(_)) => panic!("state channel closed"),
        Err(_) => panic!("timed out waiting for state"),
    }
}

enum Reply<T> {
    Ready(Result<T, RemoteError>),
    Gated(oneshot::Receiver<Result<T, RemoteError>>),
}

/// Replies handed out in push order.
struct Script<T> {
    replies: Mutex<VecDeque<Reply<T>>>,
}

impl<T> Script<T> {
    fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
        }
    }

    fn push(&self, reply: Reply<T>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    fn push_gated(&self) -> oneshot::Sender<Result<T, RemoteError>> {
        let (tx, rx) = oneshot::channel();
        self.push(Reply::Gated(rx));
        tx
    }

    async fn next(&self) -> Result<T, RemoteError> {
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ready(result)) => result,
            Some(Reply::Gated(rx)) => rx
                .await
                .unwrap_or_else(|_| Err(RemoteError::Transport("reply dropped".into()))),
            None => Err(RemoteError::Transport("no scripted reply".into())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchCall {
    pub query: String,
    pub page_size: usize,
    pub cursor: Option<String>,
}

pub struct ScriptedSearchGateway {
    script: Script<SearchPage>,
    calls: Mutex<Vec<SearchCall>>,
}

impl ScriptedSearchGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push_ok(&self, page: SearchPage) {
        self.script.push(Reply::Ready(Ok(page)));
    }

    pub fn push_err(&self, err: RemoteError) {
        self.script.push(Reply::Ready(Err(err)));
    }

    /// The call that takes this reply blocks until the returned sender fires.
    pub fn push_gated(&self) -> oneshot::Sender<Result<SearchPage, RemoteError>> {
        self.script.push_gated()
    }

    pub fn calls(&self) -> Vec<SearchCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchGateway for ScriptedSearchGateway {
    async fn search_repositories(
        &self,
        query: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<SearchPage, RemoteError> {
        self.calls.lock().unwrap().push(SearchCall {
            query: query.to_string(),
            page_size,
            cursor: cursor.map(str::to_string),
        });
        self.script.next().await
    }
}

pub struct ScriptedDetailGateway {
    script: Script<RepositoryDetails>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedDetailGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Script::new(),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn push_ok(&self, details: RepositoryDetails) {
        self.script.push(Reply::Ready(Ok(details)));
    }

    pub fn push_err(&self, err: RemoteError) {
        self.script.push(Reply::Ready(Err(err)));
    }

    pub fn push_gated(&self) -> oneshot::Sender<Result<RepositoryDetails, RemoteError>> {
        self.script.push_gated()
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DetailGateway for ScriptedDetailGateway {
    async fn repository_details(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryDetails, RemoteError> {
        self.calls
            .lock()
            .unwrap()
            .push((owner.to_string(), name.to_string()));
        self.script.next().await
    }
}

/// In-memory store whose writes, reads and snapshots can be made to fail.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryFavoritesStore,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
    fail_snapshots: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Point reads (`get`, `exists`, `count`, `list_all`).
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Snapshots delivered through `subscribe_all`.
    pub fn fail_snapshots(&self, fail: bool) {
        self.fail_snapshots.store(fail, Ordering::SeqCst);
    }

    fn check_writes(&self) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::Backend("write rejected".into()))
        } else {
            Ok(())
        }
    }

    fn check_reads(&self) -> Result<(), StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(StorageError::Backend("read rejected".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FavoritesStore for FlakyStore {
    async fn list_all(&self) -> Result<Vec<FavoriteRecord>, StorageError> {
        self.check_reads()?;
        self.inner.list_all().await
    }

    fn subscribe_all(&self) -> SnapshotStream<Vec<FavoriteRecord>> {
        let fail = self.fail_snapshots.clone();
        self.inner
            .subscribe_all()
            .map(move |snapshot| {
                if fail.load(Ordering::SeqCst) {
                    Err(StorageError::Backend("snapshot rejected".into()))
                } else {
                    snapshot
                }
            })
            .boxed()
    }

    async fn get(&self, id: &str) -> Result<Option<FavoriteRecord>, StorageError> {
        self.check_reads()?;
        self.inner.get(id).await
    }

    async fn exists(&self, id: &str) -> Result<bool, StorageError> {
        self.check_reads()?;
        self.inner.exists(id).await
    }

    async fn upsert(&self, record: FavoriteRecord) -> Result<(), StorageError> {
        self.check_writes()?;
        self.inner.upsert(record).await
    }

    async fn delete(&self, id: &str) -> Result<(), StorageError> {
        self.check_writes()?;
        self.inner.delete(id).await
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        self.check_writes()?;
        self.inner.delete_all().await
    }

    async fn count(&self) -> Result<u64, StorageError> {
        self.check_reads()?;
        self.inner.count().await
    }

    fn subscribe_count(&self) -> SnapshotStream<u64> {
        self.inner.subscribe_count()
    }
}
