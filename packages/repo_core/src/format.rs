//! Display formatting for dates, counts, language shares and colors.

use chrono::{DateTime, Utc};

const GRAY: (u8, u8, u8) = (0x9E, 0x9E, 0x9E);

pub fn parse_timestamp(iso: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(iso.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// `"Jan 15, 2023"`, or `"Unknown date"` when `iso` does not parse.
pub fn format_created_date(iso: &str) -> String {
    match parse_timestamp(iso) {
        Some(dt) => dt.format("%b %-d, %Y").to_string(),
        None => "Unknown date".to_string(),
    }
}

/// Coarse age of `iso` relative to `now`, e.g. `"3 weeks ago"`.
pub fn format_relative_time(iso: &str, now: DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(iso) else {
        return "recently".to_string();
    };
    let elapsed = now.signed_duration_since(then);
    let days = elapsed.num_days();

    let (amount, unit) = if days >= 365 {
        (days / 365, "year")
    } else if days >= 30 {
        (days / 30, "month")
    } else if days >= 7 {
        (days / 7, "week")
    } else if days >= 1 {
        (days, "day")
    } else if elapsed.num_hours() >= 1 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() >= 1 {
        (elapsed.num_minutes(), "minute")
    } else {
        return "just now".to_string();
    };

    if amount == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{amount} {unit}s ago")
    }
}

/// `999` stays as is, `1500` becomes `"1k"`.
pub fn format_count(n: u32) -> String {
    if n >= 1000 {
        format!("{}k", n / 1000)
    } else {
        n.to_string()
    }
}

/// One decimal, truncated toward zero: `85.37` becomes `"85.3%"`.
pub fn format_percentage(percentage: f64) -> String {
    let truncated = (percentage * 10.0).trunc() / 10.0;
    format!("{truncated:.1}%")
}

pub fn parse_hex_color(color: Option<&str>) -> (u8, u8, u8) {
    let Some(hex) = color.map(|c| c.trim().trim_start_matches('#')) else {
        return GRAY;
    };
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return GRAY;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => (r, g, b),
        _ => GRAY,
    }
}
