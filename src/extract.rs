use crate::error::{DashError, Result};
use crate::git::{LogEntry, VersionControl};
use crate::model::{CommitRecord, DiffSummary, LogFilter};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    pub filter: LogFilter,
    pub show_progress: bool,
}

/// Read the history of `branch` as newest-first [`CommitRecord`]s.
///
/// Each commit is diffed against its first parent, one `git diff` per
/// commit. The oldest commit of the sequence keeps zeroed stats. A diff that
/// fails is logged and zeroed without aborting the extraction.
pub fn extract_commits(
    vcs: &dyn VersionControl,
    path: &Path,
    branch: &str,
    options: &ExtractOptions,
) -> Result<Vec<CommitRecord>> {
    if !path.exists() {
        return Err(DashError::PathNotFound(path.to_path_buf()));
    }
    if !vcs.check_is_repo(path) {
        return Err(DashError::NotARepository(path.to_path_buf()));
    }
    if branch.trim().is_empty() {
        return Err(DashError::MissingParameter("branch"));
    }

    if !vcs.has_commits(path)? {
        tracing::info!(path = %path.display(), "repository has no commits");
        return Ok(Vec::new());
    }

    let entries = vcs.log(path, branch, &options.filter)?;
    tracing::debug!(count = entries.len(), branch, "read commit log");

    let pb = if options.show_progress {
        let pb = ProgressBar::new(entries.len() as u64);
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg} {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message("Computing diff stats...");
        pb
    } else {
        ProgressBar::hidden()
    };

    let last = entries.len().saturating_sub(1);
    let mut commits = Vec::with_capacity(entries.len());

    for (idx, entry) in entries.into_iter().enumerate() {
        let stats = if idx == last {
            DiffSummary::default()
        } else {
            commit_stats(vcs, path, &entry)
        };
        commits.push(into_record(entry, stats));
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(commits)
}

fn commit_stats(vcs: &dyn VersionControl, path: &Path, entry: &LogEntry) -> DiffSummary {
    let parent = format!("{}^", entry.hash);
    match vcs.diff_summary(path, &parent, &entry.hash) {
        Ok(stats) => stats,
        Err(e) => {
            tracing::warn!(commit = %entry.hash, error = %e, "diff failed, using zero stats");
            DiffSummary::default()
        }
    }
}

fn into_record(entry: LogEntry, stats: DiffSummary) -> CommitRecord {
    CommitRecord {
        hash: entry.hash,
        author_name: entry.author_name,
        author_email: entry.author_email,
        timestamp: entry.timestamp,
        message: entry.message,
        insertions: stats.insertions,
        deletions: stats.deletions,
        files_changed: stats.files_changed,
    }
}
