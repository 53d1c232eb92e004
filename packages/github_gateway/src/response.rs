//! Wire shapes of GitHub GraphQL responses and their conversion into the
//! `repo_core` model.

use repo_core::{
    LanguageBreakdown, PrimaryLanguage, RemoteError, RepositoryDetails, RepositorySummary,
    SearchPage,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl<T> Envelope<T> {
    /// Any reported error wins over partial data.
    pub fn into_data(self) -> Result<T, RemoteError> {
        if !self.errors.is_empty() {
            return Err(RemoteError::GraphQl(
                self.errors.into_iter().map(|e| e.message).collect(),
            ));
        }
        self.data.ok_or(RemoteError::NoData)
    }

    fn only_not_found_errors(&self) -> bool {
        !self.errors.is_empty()
            && self
                .errors
                .iter()
                .all(|e| e.kind.as_deref() == Some("NOT_FOUND"))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Owner {
    login: String,
    avatar_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Language {
    name: String,
    color: Option<String>,
}

impl From<Language> for PrimaryLanguage {
    fn from(language: Language) -> Self {
        Self {
            name: language.name,
            color: language.color,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TotalCount {
    #[serde(rename = "totalCount")]
    total_count: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    search: SearchConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchConnection {
    page_info: PageInfo,
    #[serde(default)]
    edges: Option<Vec<Option<SearchEdge>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    has_next_page: bool,
    end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchEdge {
    node: Option<SearchNode>,
}

/// Search results are a union; only repositories are kept.
#[derive(Debug, Deserialize)]
#[serde(tag = "__typename")]
enum SearchNode {
    Repository(RepositoryNode),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryNode {
    id: String,
    name: String,
    name_with_owner: String,
    description: Option<String>,
    stargazer_count: u32,
    fork_count: u32,
    url: String,
    owner: Owner,
    primary_language: Option<Language>,
}

impl From<RepositoryNode> for RepositorySummary {
    fn from(node: RepositoryNode) -> Self {
        Self {
            id: node.id,
            name: node.name,
            owner_login: node.owner.login,
            name_with_owner: node.name_with_owner,
            description: node.description,
            star_count: node.stargazer_count,
            fork_count: node.fork_count,
            primary_language: node.primary_language.map(PrimaryLanguage::from),
            owner_avatar_url: node.owner.avatar_url,
            url: node.url,
        }
    }
}

impl From<SearchData> for SearchPage {
    fn from(data: SearchData) -> Self {
        let items = data
            .search
            .edges
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .filter_map(|edge| match edge.node {
                Some(SearchNode::Repository(node)) => Some(RepositorySummary::from(node)),
                _ => None,
            })
            .collect();
        Self {
            items,
            has_more: data.search.page_info.has_next_page,
            end_cursor: data.search.page_info.end_cursor,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct DetailsData {
    repository: Option<DetailsNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetailsNode {
    id: String,
    name: String,
    name_with_owner: String,
    description: Option<String>,
    stargazer_count: u32,
    fork_count: u32,
    url: String,
    homepage_url: Option<String>,
    created_at: String,
    updated_at: String,
    owner: Owner,
    primary_language: Option<Language>,
    watchers: TotalCount,
    issues: TotalCount,
    pull_requests: TotalCount,
    license_info: Option<License>,
    languages: Option<LanguageConnection>,
}

#[derive(Debug, Deserialize)]
struct License {
    name: String,
}

#[derive(Debug, Deserialize)]
struct LanguageConnection {
    #[serde(default)]
    edges: Option<Vec<Option<LanguageEdge>>>,
}

#[derive(Debug, Deserialize)]
struct LanguageEdge {
    size: u64,
    node: Language,
}

impl From<DetailsNode> for RepositoryDetails {
    fn from(node: DetailsNode) -> Self {
        let languages = node
            .languages
            .and_then(|l| l.edges)
            .unwrap_or_default()
            .into_iter()
            .flatten()
            .map(|edge| LanguageBreakdown {
                name: edge.node.name,
                color: edge.node.color,
                byte_size: edge.size,
            })
            .collect();
        // GitHub sends an empty string for repositories without a homepage
        let homepage_url = node.homepage_url.filter(|url| !url.trim().is_empty());
        Self {
            id: node.id,
            name: node.name,
            owner_login: node.owner.login,
            name_with_owner: node.name_with_owner,
            description: node.description,
            star_count: node.stargazer_count,
            fork_count: node.fork_count,
            watcher_count: node.watchers.total_count,
            open_issue_count: node.issues.total_count,
            open_pull_request_count: node.pull_requests.total_count,
            primary_language: node.primary_language.map(PrimaryLanguage::from),
            license: node.license_info.map(|l| l.name),
            created_at: node.created_at,
            updated_at: node.updated_at,
            url: node.url,
            homepage_url,
            owner_avatar_url: node.owner.avatar_url,
            languages,
        }
    }
}

pub(crate) fn search_page(envelope: Envelope<SearchData>) -> Result<SearchPage, RemoteError> {
    envelope.into_data().map(SearchPage::from)
}

/// A `null` repository, alone or with only `NOT_FOUND` errors, means the
/// repository does not exist.
pub(crate) fn repository_details(
    envelope: Envelope<DetailsData>,
    owner: &str,
    name: &str,
) -> Result<RepositoryDetails, RemoteError> {
    let not_found = || RemoteError::NotFound {
        owner: owner.to_string(),
        name: name.to_string(),
    };
    let missing_repository = matches!(&envelope.data, Some(DetailsData { repository: None }));
    if envelope.only_not_found_errors() && (envelope.data.is_none() || missing_repository) {
        return Err(not_found());
    }
    match envelope.into_data()?.repository {
        Some(node) => Ok(RepositoryDetails::from(node)),
        None => Err(not_found()),
    }
}
