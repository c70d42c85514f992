use crate::cli::CommonArgs;
use crate::config::Config;
use crate::error::{DashError, Result};
use crate::git::{GitCli, GitRepo, VersionControl};
use crate::model::{FileChurn, SCHEMA_VERSION};
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_WINDOW: &str = "1 month ago";

const EXCLUDED_FILES: &[&str] = &[
    "package-lock.json",
    "npm-shrinkwrap.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "go.sum",
    "composer.lock",
    "Gemfile.lock",
    "poetry.lock",
    "Pipfile.lock",
];

const EXCLUDED_EXTENSIONS: &[&str] = &["md", "markdown", "mdx", "adoc", "asciidoc", "rst"];

/// Lockfiles and prose documents never count towards churn.
pub fn is_excluded(path: &str) -> bool {
    let path = Path::new(path);
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if EXCLUDED_FILES.contains(&file_name) {
        return true;
    }
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| EXCLUDED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Aggregate `git log --numstat --format=` output into per-file totals,
/// sorted by total changes descending.
///
/// Binary entries (`-\t-\tpath`) count as zero lines. Lines that do not have
/// three tab-separated fields with numeric counts are skipped.
pub fn parse_numstat(raw: &str) -> Vec<FileChurn> {
    let mut map: HashMap<String, FileChurn> = HashMap::new();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut fields = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(path)) = (fields.next(), fields.next(), fields.next())
        else {
            tracing::debug!(line, "skipping malformed numstat line");
            continue;
        };

        let (Some(added), Some(deleted)) = (parse_count(added), parse_count(deleted)) else {
            tracing::debug!(line, "skipping numstat line with invalid counts");
            continue;
        };

        if path.is_empty() || is_excluded(path) {
            continue;
        }

        map.entry(path.to_string())
            .or_insert_with(|| FileChurn::new(path.to_string()))
            .add_stats(added, deleted);
    }

    let mut entries: Vec<_> = map.into_values().collect();
    entries.sort_by(|a, b| {
        b.total_changes
            .cmp(&a.total_changes)
            .then_with(|| a.path.cmp(&b.path))
    });
    entries
}

fn parse_count(field: &str) -> Option<u64> {
    let field = field.trim();
    if field == "-" {
        Some(0)
    } else {
        field.parse().ok()
    }
}

/// Per-file churn for commits newer than `since` on the checked-out branch.
pub fn compute_churn(vcs: &dyn VersionControl, path: &Path, since: &str) -> Result<Vec<FileChurn>> {
    if !path.exists() {
        return Err(DashError::PathNotFound(path.to_path_buf()));
    }
    if !vcs.check_is_repo(path) {
        return Err(DashError::NotARepository(path.to_path_buf()));
    }
    if !vcs.has_commits(path)? {
        return Ok(Vec::new());
    }

    let raw = vcs.raw_numstat(path, since)?;
    let entries = parse_numstat(&raw);
    tracing::debug!(files = entries.len(), since, "computed churn");
    Ok(entries)
}

#[derive(Debug, Serialize)]
struct ChurnOutput<'a> {
    version: u32,
    generated_at: DateTime<Utc>,
    repository_path: String,
    since: &'a str,
    entries: &'a [FileChurn],
}

pub fn exec(
    common: CommonArgs,
    path: Option<PathBuf>,
    since: Option<String>,
    json: bool,
    ndjson: bool,
) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let requested = match path {
        Some(p) => p,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let repo = GitRepo::discover(&requested).context("Failed to open git repository")?;
    let since = since.unwrap_or_else(|| config.churn_window.clone());

    let churn = compute_churn(&GitCli::new(), repo.path(), &since)
        .context("Failed to compute churn statistics")?;

    if json {
        output_json(&churn, repo.path(), &since)?;
    } else if ndjson {
        output_ndjson(&churn)?;
    } else {
        output_table(&churn, &since)?;
    }

    Ok(())
}

fn output_json(churn_data: &[FileChurn], repo_path: &Path, since: &str) -> anyhow::Result<()> {
    let output = ChurnOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repository_path: repo_path.to_string_lossy().to_string(),
        since,
        entries: churn_data,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_ndjson(churn_data: &[FileChurn]) -> anyhow::Result<()> {
    for e in churn_data {
        println!("{}", serde_json::to_string(e)?);
    }
    Ok(())
}

fn output_table(churn_data: &[FileChurn], since: &str) -> anyhow::Result<()> {
    println!("Churn since {}", style(since).cyan());
    println!(
        "{:<50} {:>8} {:>8} {:>8} {:>8}",
        style("Path").bold(),
        style("Added").bold(),
        style("Deleted").bold(),
        style("Total").bold(),
        style("Commits").bold()
    );
    println!("{}", "─".repeat(86));
    for e in churn_data.iter().take(50) {
        println!(
            "{:<50} {:>8} {:>8} {:>8} {:>8}",
            crate::util::truncate(&e.path, 50),
            e.lines_added,
            e.lines_deleted,
            e.total_changes,
            e.commits
        );
    }
    if churn_data.len() > 50 {
        println!("\n... and {} more entries", churn_data.len() - 50);
    }
    Ok(())
}
