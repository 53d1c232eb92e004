//! Repository data model shared by gateways, stores and coordinators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A repository as it appears in a search result row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySummary {
    /// Stable, globally unique node id
    pub id: String,
    pub name: String,
    pub owner_login: String,
    /// `owner/name`
    pub name_with_owner: String,
    pub description: Option<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub primary_language: Option<PrimaryLanguage>,
    pub owner_avatar_url: Option<String>,
    pub url: String,
}

/// Name and display color of a repository's primary language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryLanguage {
    pub name: String,
    /// Hex color such as `#A97BFF`
    pub color: Option<String>,
}

/// Bytes of one language tracked in a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageBreakdown {
    pub name: String,
    pub color: Option<String>,
    pub byte_size: u64,
}

/// A language with its derived share of the repository's tracked bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageShare {
    pub name: String,
    pub color: Option<String>,
    pub byte_size: u64,
    /// 0.0..=100.0; 0.0 when the repository tracks no bytes at all
    pub percentage: f64,
}

/// Everything the detail view shows for one repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryDetails {
    pub id: String,
    pub name: String,
    pub owner_login: String,
    pub name_with_owner: String,
    pub description: Option<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub watcher_count: u32,
    pub open_issue_count: u32,
    pub open_pull_request_count: u32,
    pub primary_language: Option<PrimaryLanguage>,
    pub license: Option<String>,
    /// ISO-8601 timestamp as reported upstream
    pub created_at: String,
    /// ISO-8601 timestamp as reported upstream
    pub updated_at: String,
    pub url: String,
    pub homepage_url: Option<String>,
    pub owner_avatar_url: Option<String>,
    /// Ordered as delivered by the gateway (largest first for GitHub)
    pub languages: Vec<LanguageBreakdown>,
}

impl RepositoryDetails {
    /// Projection stored when the repository is favorited from its detail view.
    pub fn to_summary(&self) -> RepositorySummary {
        RepositorySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_login: self.owner_login.clone(),
            name_with_owner: self.name_with_owner.clone(),
            description: self.description.clone(),
            star_count: self.star_count,
            fork_count: self.fork_count,
            primary_language: self.primary_language.clone(),
            owner_avatar_url: self.owner_avatar_url.clone(),
            url: self.url.clone(),
        }
    }

    pub fn total_language_bytes(&self) -> u64 {
        self.languages.iter().map(|l| l.byte_size).sum()
    }

    /// Percentages of the tracked bytes, in the order of `languages`.
    pub fn language_shares(&self) -> Vec<LanguageShare> {
        let total = self.total_language_bytes();
        self.languages
            .iter()
            .map(|language| LanguageShare {
                name: language.name.clone(),
                color: language.color.clone(),
                byte_size: language.byte_size,
                percentage: if total == 0 {
                    0.0
                } else {
                    language.byte_size as f64 / total as f64 * 100.0
                },
            })
            .collect()
    }
}

/// Persisted projection of a [`RepositorySummary`], keyed by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteRecord {
    pub id: String,
    pub name: String,
    pub owner_login: String,
    pub name_with_owner: String,
    pub description: Option<String>,
    pub star_count: u32,
    pub fork_count: u32,
    pub language: Option<String>,
    pub language_color: Option<String>,
    pub owner_avatar_url: Option<String>,
    pub url: String,
    /// When this record was last written
    pub saved_at: DateTime<Utc>,
}

impl FavoriteRecord {
    pub fn from_summary(summary: &RepositorySummary, saved_at: DateTime<Utc>) -> Self {
        let (language, language_color) = match &summary.primary_language {
            Some(lang) => (Some(lang.name.clone()), lang.color.clone()),
            None => (None, None),
        };
        Self {
            id: summary.id.clone(),
            name: summary.name.clone(),
            owner_login: summary.owner_login.clone(),
            name_with_owner: summary.name_with_owner.clone(),
            description: summary.description.clone(),
            star_count: summary.star_count,
            fork_count: summary.fork_count,
            language,
            language_color,
            owner_avatar_url: summary.owner_avatar_url.clone(),
            url: summary.url.clone(),
            saved_at,
        }
    }

    pub fn to_summary(&self) -> RepositorySummary {
        RepositorySummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner_login: self.owner_login.clone(),
            name_with_owner: self.name_with_owner.clone(),
            description: self.description.clone(),
            star_count: self.star_count,
            fork_count: self.fork_count,
            primary_language: self.language.as_ref().map(|name| PrimaryLanguage {
                name: name.clone(),
                color: self.language_color.clone(),
            }),
            owner_avatar_url: self.owner_avatar_url.clone(),
            url: self.url.clone(),
        }
    }
}

/// One page of search results. Never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<RepositorySummary>,
    pub has_more: bool,
    /// Opaque continuation token, threaded back verbatim
    pub end_cursor: Option<String>,
}
