use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use github_gateway::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, GitHubClientConfig};

// =============================================================================
// Tunable config (figment-deserialized from defaults / config.toml / env vars)
// =============================================================================
//
//   config.toml:     [github]
//                    token = "ghp_..."
//
//   env var:         REPOS_GITHUB__TOKEN=ghp_...   (double underscore = nesting)

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub github: GitHubFileConfig,
    #[serde(default)]
    pub search: SearchFileConfig,
}

/// Lives under `[github]` in config.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GitHubFileConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubFileConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl GitHubFileConfig {
    /// Client settings, falling back to `fallback_token` (normally
    /// `$GITHUB_TOKEN`) when no token is configured.
    pub fn client_config(&self, fallback_token: Option<String>) -> GitHubClientConfig {
        let token = self
            .token
            .clone()
            .or(fallback_token)
            .filter(|t| !t.trim().is_empty());
        GitHubClientConfig {
            endpoint: self.endpoint.clone(),
            token,
            user_agent: self.user_agent.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

/// Lives under `[search]` in config.toml.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchFileConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for SearchFileConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_page_size() -> usize {
    repo_core::DEFAULT_PAGE_SIZE
}

/// Build a figment that layers: defaults → config.toml → REPOS_* env vars.
pub fn load_config(data_dir: &Path) -> figment::Figment {
    use figment::{
        Figment,
        providers::{Env, Format, Serialized, Toml},
    };

    Figment::from(Serialized::defaults(FileConfig::default()))
        .merge(Toml::file(data_dir.join("config.toml")))
        .merge(Env::prefixed("REPOS_").split("__"))
}

// =============================================================================
// Directory layout (derived from --data-dir)
// =============================================================================

#[derive(Clone, Debug)]
pub struct BrowserPaths {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
}

impl BrowserPaths {
    pub fn new(custom_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match custom_dir {
            Some(dir) => dir,
            None => dirs::data_dir()
                .context("Could not determine the platform data directory; pass --data-dir")?
                .join("repos-browser"),
        };

        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory: {:?}", data_dir))?;

        let db_path = data_dir.join("favorites.db");
        debug!("Data directory: {}", data_dir.display());

        Ok(Self { data_dir, db_path })
    }

    pub fn config_toml_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }
}
