use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_subscriber::prelude::*;

mod commands;
mod config;
mod render;

use commands::App;
use config::{BrowserPaths, FileConfig, load_config};
use favorites_store::SqliteFavoritesStore;
use github_gateway::GitHubClient;

#[derive(Parser)]
#[command(name = "repos")]
#[command(about = "Search GitHub repositories and keep local favorites")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to the platform data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search repositories
    Search(SearchArgs),
    /// Show one repository in detail
    Show(ShowArgs),
    /// Toggle a repository's favorite status
    Favorite(FavoriteArgs),
    /// Manage saved favorites
    Favorites(FavoritesArgs),
}

#[derive(Parser)]
struct SearchArgs {
    /// Search text, using GitHub search syntax
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Number of result pages to fetch
    #[arg(short, long, default_value = "1")]
    pages: usize,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct ShowArgs {
    /// Repository as owner/name
    repository: String,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Parser)]
struct FavoriteArgs {
    /// Repository as owner/name
    repository: String,
}

#[derive(Parser)]
struct FavoritesArgs {
    #[command(subcommand)]
    action: Option<FavoritesAction>,
}

#[derive(Subcommand)]
enum FavoritesAction {
    /// List favorites, most recently saved first (default)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the number of favorites
    Count,
    /// Remove one favorite
    Remove {
        /// Repository as owner/name
        repository: String,
    },
    /// Remove every favorite
    Clear,
    /// Print the list again after every change until Ctrl-C
    Watch,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_directive = if cli.debug {
        "repos=debug,repo_core=debug,github_gateway=debug,favorites_store=debug,info"
    } else {
        "repos=info,warn"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();

    let paths = BrowserPaths::new(cli.data_dir.clone())?;
    let file_config: FileConfig = load_config(&paths.data_dir)
        .extract()
        .with_context(|| format!("Invalid configuration in {:?}", paths.config_toml_path()))?;
    debug!("Loaded configuration: page_size={}", file_config.search.page_size);

    let client_config = file_config
        .github
        .client_config(std::env::var("GITHUB_TOKEN").ok());
    if client_config.token.is_none() {
        info!("No GitHub token configured; set GITHUB_TOKEN or [github].token");
    }
    let client =
        Arc::new(GitHubClient::new(client_config).context("Failed to build HTTP client")?);
    let store = Arc::new(
        SqliteFavoritesStore::open(&paths.db_path)
            .await
            .with_context(|| format!("Failed to open favorites database {:?}", paths.db_path))?,
    );

    let app = App::new(
        client.clone(),
        client,
        store.clone(),
        file_config.search.page_size,
    );
    let result = run(&app, cli.command).await;
    app.shutdown();
    store.close().await;
    result
}

async fn run(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Search(args) => {
            commands::search_command(app, &args.query.join(" "), args.pages, args.json).await
        }
        Commands::Show(args) => commands::show_command(app, &args.repository, args.json).await,
        Commands::Favorite(args) => commands::favorite_command(app, &args.repository).await,
        Commands::Favorites(args) => match args.action.unwrap_or(FavoritesAction::List { json: false }) {
            FavoritesAction::List { json } => commands::favorites_list_command(app, json).await,
            FavoritesAction::Count => commands::favorites_count_command(app).await,
            FavoritesAction::Remove { repository } => {
                commands::favorites_remove_command(app, &repository).await
            }
            FavoritesAction::Clear => commands::favorites_clear_command(app).await,
            FavoritesAction::Watch => commands::favorites_watch_command(app).await,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn search_query_words_are_joined() {
        let cli = Cli::try_parse_from(["repos", "search", "kotlin", "multiplatform", "--pages", "3"])
            .unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.query.join(" "), "kotlin multiplatform");
                assert_eq!(args.pages, 3);
                assert!(!args.json);
            }
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn favorites_defaults_to_list() {
        let cli = Cli::try_parse_from(["repos", "favorites", "--data-dir", "/tmp/x"]).unwrap();
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/x")));
        match cli.command {
            Commands::Favorites(args) => assert!(args.action.is_none()),
            _ => panic!("expected favorites"),
        }
    }

    #[test]
    fn favorites_remove_takes_repository() {
        let cli = Cli::try_parse_from(["repos", "favorites", "remove", "JetBrains/kotlin"]).unwrap();
        match cli.command {
            Commands::Favorites(FavoritesArgs {
                action: Some(FavoritesAction::Remove { repository }),
            }) => assert_eq!(repository, "JetBrains/kotlin"),
            _ => panic!("expected favorites remove"),
        }
    }
}
