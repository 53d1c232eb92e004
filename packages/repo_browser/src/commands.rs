use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};

use repo_core::{
    DetailCoordinator, DetailGateway, DetailState, FavoritesCoordinator, FavoritesStore,
    LanguageShare, RepositoryDetails, RepositorySummary, SearchCoordinator, SearchGateway,
};

use crate::render;

/// Long-lived collaborators shared by every command.
pub struct App {
    pub search_gateway: Arc<dyn SearchGateway>,
    pub detail_gateway: Arc<dyn DetailGateway>,
    pub favorites: Arc<FavoritesCoordinator>,
    pub page_size: usize,
}

impl App {
    pub fn new(
        search_gateway: Arc<dyn SearchGateway>,
        detail_gateway: Arc<dyn DetailGateway>,
        store: Arc<dyn FavoritesStore>,
        page_size: usize,
    ) -> Self {
        Self {
            search_gateway,
            detail_gateway,
            favorites: FavoritesCoordinator::new(store),
            page_size,
        }
    }

    /// Wait for the favorites subscription to deliver its first snapshot.
    async fn favorites_ready(&self) -> Result<()> {
        let mut rx = self.favorites.subscribe();
        let state = rx
            .wait_for(|s| !s.loading)
            .await
            .context("favorites subscription closed")?;
        if let Some(error) = &state.error {
            bail!("Failed to read favorites: {}", error);
        }
        Ok(())
    }

    pub fn shutdown(&self) {
        self.favorites.close();
    }
}

/// Split `owner/name`, also accepting a full `https://github.com/owner/name` URL.
pub fn parse_slug(input: &str) -> Result<(String, String)> {
    let trimmed = input.trim().trim_end_matches('/');
    let slug = trimmed
        .strip_prefix("https://github.com/")
        .or_else(|| trimmed.strip_prefix("github.com/"))
        .unwrap_or(trimmed);
    match slug.split_once('/') {
        Some((owner, name))
            if !owner.is_empty() && !name.is_empty() && !name.contains('/') =>
        {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => bail!("Expected a repository as owner/name, got {:?}", input),
    }
}

#[derive(Serialize)]
struct SearchRow<'a> {
    #[serde(flatten)]
    repository: &'a RepositorySummary,
    favorite: bool,
}

pub async fn search_command(app: &App, query: &str, pages: usize, json: bool) -> Result<()> {
    if query.trim().is_empty() {
        bail!("Search query must not be blank");
    }
    app.favorites_ready().await?;

    let search = SearchCoordinator::with_page_size(
        app.search_gateway.clone(),
        app.favorites.clone(),
        app.page_size,
    );
    search.set_query(query);
    search.search().await;

    let mut loaded = 1;
    while loaded < pages.max(1) {
        let state = search.state();
        if !state.has_more || state.error.is_some() {
            break;
        }
        search.load_more().await;
        loaded += 1;
    }

    let state = search.state();
    if let Some(error) = &state.error {
        if state.results.is_empty() {
            bail!("Search failed: {}", error);
        }
        eprintln!("warning: {}", error);
    }
    info!(
        "{} results for {:?} across {} page(s)",
        state.results.len(),
        query.trim(),
        loaded
    );

    let status = search.favorite_status();
    if json {
        let rows: Vec<_> = state
            .results
            .iter()
            .map(|repository| SearchRow {
                repository,
                favorite: status.get(&repository.id).copied().unwrap_or(false),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        print!("{}", render::search_results(&state.results, &status));
        if state.has_more {
            println!("\nMore results available (use --pages to fetch more)");
        }
    }
    search.close();
    Ok(())
}

async fn load_details(app: &App, slug: &str) -> Result<(DetailCoordinator, RepositoryDetails)> {
    let (owner, name) = parse_slug(slug)?;
    let detail = DetailCoordinator::new(app.detail_gateway.clone(), app.favorites.clone());
    detail.load_details(&owner, &name).await;

    let DetailState { details, error, .. } = detail.state();
    match (details, error) {
        (Some(details), None) => Ok((detail, details)),
        (_, Some(error)) => bail!("{}", error),
        (None, None) => bail!("No details returned for {}/{}", owner, name),
    }
}

#[derive(Serialize)]
struct DetailOutput<'a> {
    #[serde(flatten)]
    repository: &'a RepositoryDetails,
    language_shares: Vec<LanguageShare>,
    favorite: bool,
}

pub async fn show_command(app: &App, slug: &str, json: bool) -> Result<()> {
    let (detail, details) = load_details(app, slug).await?;
    let is_favorite = detail.state().is_favorite;

    if json {
        let output = DetailOutput {
            repository: &details,
            language_shares: details.language_shares(),
            favorite: is_favorite,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print!("{}", render::details(&details, is_favorite, Utc::now()));
    }
    detail.close();
    Ok(())
}

pub async fn favorite_command(app: &App, slug: &str) -> Result<()> {
    let (detail, details) = load_details(app, slug).await?;

    detail.toggle_favorite().await;
    let state = detail.state();
    if let Some(error) = state.error {
        bail!("Failed to update favorites: {}", error);
    }
    if state.is_favorite {
        println!("★ Added {} to favorites", details.name_with_owner);
    } else {
        println!("Removed {} from favorites", details.name_with_owner);
    }
    detail.close();
    Ok(())
}

pub async fn favorites_list_command(app: &App, json: bool) -> Result<()> {
    app.favorites_ready().await?;
    let records = app.favorites.favorites();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        print!("{}", render::favorites(&records, Utc::now()));
    }
    Ok(())
}

pub async fn favorites_count_command(app: &App) -> Result<()> {
    app.favorites_ready().await?;
    println!("{}", app.favorites.count());
    Ok(())
}

pub async fn favorites_remove_command(app: &App, slug: &str) -> Result<()> {
    let (owner, name) = parse_slug(slug)?;
    let wanted = format!("{owner}/{name}");
    app.favorites_ready().await?;

    let Some(record) = app
        .favorites
        .favorites()
        .into_iter()
        .find(|f| f.name_with_owner.eq_ignore_ascii_case(&wanted))
    else {
        bail!("{} is not a favorite", wanted);
    };

    if !app.favorites.remove_favorite(&record.to_summary()).await {
        let error = app.favorites.state().error.unwrap_or_default();
        bail!("Failed to remove {}: {}", record.name_with_owner, error);
    }
    println!("Removed {} from favorites", record.name_with_owner);
    Ok(())
}

pub async fn favorites_clear_command(app: &App) -> Result<()> {
    app.favorites_ready().await?;
    let count = app.favorites.count();
    if !app.favorites.clear_all().await {
        let error = app.favorites.state().error.unwrap_or_default();
        bail!("Failed to clear favorites: {}", error);
    }
    println!("Cleared {} favorite(s)", count);
    Ok(())
}

/// Print every favorites snapshot until Ctrl-C.
pub async fn favorites_watch_command(app: &App) -> Result<()> {
    let mut rx = app.favorites.subscribe();
    let mut last_printed = None;

    loop {
        let state = rx.borrow_and_update().clone();
        if !state.loading && last_printed.as_ref() != Some(&state.favorites) {
            if let Some(error) = &state.error {
                eprintln!("warning: {}", error);
            }
            print!("{}", render::favorites(&state.favorites, Utc::now()));
            println!();
            last_printed = Some(state.favorites);
        }
        if !state.subscribed {
            debug!("favorites subscription ended");
            return Ok(());
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                debug!("interrupted");
                return Ok(());
            }
        }
    }
}
