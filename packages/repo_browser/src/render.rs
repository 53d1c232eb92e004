//! Plain-text rendering for terminal output.

use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use repo_core::format::{
    format_count, format_created_date, format_percentage, format_relative_time, parse_hex_color,
};
use repo_core::{FavoriteRecord, RepositoryDetails, RepositorySummary};

const FAVORITE_MARK: &str = "★";

fn mark(favorite: bool) -> &'static str {
    if favorite { FAVORITE_MARK } else { " " }
}

fn language_label(name: Option<&str>) -> &str {
    name.unwrap_or("-")
}

pub fn search_results(results: &[RepositorySummary], status: &HashMap<String, bool>) -> String {
    if results.is_empty() {
        return "No repositories found.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  {:<45} {:>7} {:>7}  {}",
        "REPOSITORY", "STARS", "FORKS", "LANGUAGE"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));
    for repo in results {
        let favorite = status.get(&repo.id).copied().unwrap_or(false);
        let _ = writeln!(
            out,
            "{} {:<45} {:>7} {:>7}  {}",
            mark(favorite),
            repo.name_with_owner,
            format_count(repo.star_count),
            format_count(repo.fork_count),
            language_label(repo.primary_language.as_ref().map(|l| l.name.as_str())),
        );
        if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
            let _ = writeln!(out, "    {}", truncate(description, 76));
        }
    }
    out
}

pub fn details(details: &RepositoryDetails, is_favorite: bool, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", mark(is_favorite), details.name_with_owner);
    if let Some(description) = &details.description {
        let _ = writeln!(out, "  {description}");
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "  Stars {}  Forks {}  Watchers {}  Issues {}  Pull requests {}",
        format_count(details.star_count),
        format_count(details.fork_count),
        format_count(details.watcher_count),
        format_count(details.open_issue_count),
        format_count(details.open_pull_request_count),
    );
    let _ = writeln!(
        out,
        "  License   {}",
        details.license.as_deref().unwrap_or("No license")
    );
    let _ = writeln!(out, "  Created   {}", format_created_date(&details.created_at));
    let _ = writeln!(
        out,
        "  Updated   {}",
        format_relative_time(&details.updated_at, now)
    );
    let _ = writeln!(out, "  URL       {}", details.url);
    if let Some(homepage) = &details.homepage_url {
        let _ = writeln!(out, "  Homepage  {homepage}");
    }

    let shares = details.language_shares();
    if !shares.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  Languages");
        for share in shares {
            let (r, g, b) = parse_hex_color(share.color.as_deref());
            let _ = writeln!(
                out,
                "    {:<20} {:>7}  #{:02X}{:02X}{:02X}",
                share.name,
                format_percentage(share.percentage),
                r,
                g,
                b
            );
        }
    }
    out
}

pub fn favorites(records: &[FavoriteRecord], now: DateTime<Utc>) -> String {
    if records.is_empty() {
        return "No favorites yet.\n".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<45} {:>7}  {:<12} {}",
        "REPOSITORY", "STARS", "LANGUAGE", "SAVED"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));
    for record in records {
        let _ = writeln!(
            out,
            "{:<45} {:>7}  {:<12} {}",
            record.name_with_owner,
            format_count(record.star_count),
            language_label(record.language.as_deref()),
            format_relative_time(&record.saved_at.to_rfc3339(), now),
        );
    }
    let _ = writeln!(out, "\n{} favorite(s)", records.len());
    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let cut: String = line.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
