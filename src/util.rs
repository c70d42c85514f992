use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use regex::Regex;
use std::path::Path;

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

pub fn year_month_key(date: NaiveDate) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

/// Calendar date in the commit author's own timezone.
pub fn local_date(timestamp: &DateTime<FixedOffset>) -> NaiveDate {
    timestamp.date_naive()
}

/// Inclusive number of calendar days between two timestamps.
pub fn days_spanned(first: &DateTime<FixedOffset>, last: &DateTime<FixedOffset>) -> i64 {
    (local_date(last) - local_date(first)).num_days().abs() + 1
}

pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Rounds to two decimals for stable JSON output.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Last path component, used as a display name for repositories.
pub fn repo_name_from_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// Compiles one of the crate's built-in patterns, logging instead of
/// panicking if it is rejected. Callers treat `None` as "no match".
pub fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "built-in pattern failed to compile");
            None
        }
    }
}

pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{kept}...")
    } else {
        s.to_string()
    }
}
