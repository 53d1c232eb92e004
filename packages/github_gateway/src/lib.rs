//! GitHub GraphQL client implementing [`SearchGateway`] and [`DetailGateway`].

mod queries;
mod response;

use std::time::Duration;

use async_trait::async_trait;
use repo_core::{DetailGateway, RemoteError, RepositoryDetails, SearchGateway, SearchPage};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

pub use queries::{REPOSITORY_DETAILS, SEARCH_REPOSITORIES};

use response::{DetailsData, Envelope, SearchData};

pub const DEFAULT_ENDPOINT: &str = "https://api.github.com/graphql";
pub const DEFAULT_USER_AGENT: &str = concat!("repos-browser/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone)]
pub struct GitHubClientConfig {
    pub endpoint: String,
    /// Personal access token sent as `Authorization: Bearer`
    pub token: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for GitHubClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            token: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Serialize)]
struct GraphQlRequest<'a> {
    query: &'a str,
    variables: serde_json::Value,
}

#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    config: GitHubClientConfig,
}

impl GitHubClient {
    pub fn new(config: GitHubClientConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()
            .map_err(transport)?;
        Ok(Self { http, config })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn has_token(&self) -> bool {
        self.config.token.is_some()
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        operation: &str,
        query: &str,
        variables: serde_json::Value,
    ) -> Result<Envelope<T>, RemoteError> {
        debug!("POST {} ({})", self.config.endpoint, operation);

        let mut request = self
            .http
            .post(&self.config.endpoint)
            .json(&GraphQlRequest { query, variables });
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = http_message(&body, status.canonical_reason());
            warn!("{} failed with HTTP {}: {}", operation, status.as_u16(), message);
            return Err(RemoteError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        if !envelope.errors.is_empty() {
            let messages: Vec<_> = envelope.errors.iter().map(|e| e.message.as_str()).collect();
            warn!("{} returned GraphQL errors: {}", operation, messages.join(", "));
        }
        Ok(envelope)
    }
}

#[async_trait]
impl SearchGateway for GitHubClient {
    async fn search_repositories(
        &self,
        query: &str,
        page_size: usize,
        cursor: Option<&str>,
    ) -> Result<SearchPage, RemoteError> {
        let variables = json!({
            "query": query,
            "first": page_size,
            "after": cursor,
        });
        let envelope = self
            .execute::<SearchData>("SearchRepositories", SEARCH_REPOSITORIES, variables)
            .await?;
        let page = response::search_page(envelope)?;
        debug!(
            "search {:?}: {} items, has_more={}",
            query,
            page.items.len(),
            page.has_more
        );
        Ok(page)
    }
}

#[async_trait]
impl DetailGateway for GitHubClient {
    async fn repository_details(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<RepositoryDetails, RemoteError> {
        let variables = json!({ "owner": owner, "name": name });
        let envelope = self
            .execute::<DetailsData>("GetRepositoryDetails", REPOSITORY_DETAILS, variables)
            .await?;
        response::repository_details(envelope, owner, name)
    }
}

fn transport(err: reqwest::Error) -> RemoteError {
    if err.is_timeout() {
        RemoteError::Transport("request timed out".to_string())
    } else {
        RemoteError::Transport(err.to_string())
    }
}

/// GitHub error bodies are JSON with a `message`; fall back to the raw body.
fn http_message(body: &str, reason: Option<&str>) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: String,
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed.message;
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        trimmed.chars().take(200).collect()
    }
}
