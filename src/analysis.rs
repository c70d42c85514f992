use crate::buckets::{aggregate, distinct_authors, summarize};
use crate::churn::compute_churn;
use crate::cli::CommonArgs;
use crate::config::Config;
use crate::error::{DashError, Result};
use crate::extract::{extract_commits, ExtractOptions};
use crate::git::{GitCli, VersionControl};
use crate::model::{ChurnSummary, CommitRecord, LogFilter, RepoAnalysisResult, SCHEMA_VERSION};
use crate::store::{AnalysisStatus, ArtifactStore, IndexUpdate, RepositoryIndex, SqliteIndex};
use crate::util::repo_name_from_path;
use anyhow::Context;
use chrono::Utc;
use console::style;
use std::path::{Path, PathBuf};

/// Files kept in the churn summary embedded in each artifact.
pub const CHURN_SUMMARY_LIMIT: usize = 20;

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub branch: Option<String>,
    pub churn_window: String,
    pub recent_commits: usize,
    pub show_progress: bool,
}

impl AnalysisOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            branch: None,
            churn_window: config.churn_window.clone(),
            recent_commits: config.recent_commits,
            show_progress: false,
        }
    }
}

/// Assemble the persisted artifact from an extracted history.
pub fn build_result(
    repo_name: &str,
    repo_path: &str,
    branch: &str,
    commits: &[CommitRecord],
    churn: ChurnSummary,
    recent_limit: usize,
) -> RepoAnalysisResult {
    let buckets = aggregate(commits);

    let mut recent: Vec<CommitRecord> = commits.to_vec();
    recent.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    recent.truncate(recent_limit);

    RepoAnalysisResult {
        version: SCHEMA_VERSION,
        repo_name: repo_name.to_string(),
        repo_path: repo_path.to_string(),
        branch: branch.to_string(),
        analyzed_at: Utc::now(),
        total_commits: commits.len() as u64,
        authors: distinct_authors(commits),
        first_commit: commits.iter().map(|c| c.timestamp).min(),
        last_commit: commits.iter().map(|c| c.timestamp).max(),
        summary: summarize(commits),
        weekly: buckets.weekly,
        monthly: buckets.monthly,
        yearly: buckets.yearly,
        recent_commits: recent,
        churn,
    }
}

/// Runs the extract → bucket → persist pipeline for one repository.
pub struct RepoAnalyzer<'a> {
    vcs: &'a dyn VersionControl,
    store: &'a ArtifactStore,
    index: &'a dyn RepositoryIndex,
}

impl<'a> RepoAnalyzer<'a> {
    pub fn new(vcs: &'a dyn VersionControl, store: &'a ArtifactStore, index: &'a dyn RepositoryIndex) -> Self {
        Self { vcs, store, index }
    }

    /// Analyze the repository at `path`, write its artifact and record the
    /// outcome in the index. Returns the result and the artifact path.
    pub fn analyze(&self, path: &Path, options: &AnalysisOptions) -> Result<(RepoAnalysisResult, PathBuf)> {
        if path.as_os_str().is_empty() {
            return Err(DashError::MissingParameter("path"));
        }
        if !path.exists() {
            return Err(DashError::PathNotFound(path.to_path_buf()));
        }
        if !self.vcs.check_is_repo(path) {
            return Err(DashError::NotARepository(path.to_path_buf()));
        }

        let canonical = path.canonicalize()?;
        let repo_path = canonical.to_string_lossy().to_string();
        let repo_name = repo_name_from_path(&canonical);

        self.mark(&repo_path, AnalysisStatus::Analyzing, IndexUpdate {
            repo_name: repo_name.clone(),
            ..Default::default()
        });

        match self.run(&canonical, &repo_name, &repo_path, options) {
            Ok((result, artifact)) => {
                self.mark(&repo_path, AnalysisStatus::Completed, IndexUpdate {
                    repo_name,
                    output_file: Some(artifact.to_string_lossy().to_string()),
                    branch: Some(result.branch.clone()),
                    error: None,
                });
                tracing::info!(
                    repo = %result.repo_name,
                    commits = result.total_commits,
                    artifact = %artifact.display(),
                    "analysis complete"
                );
                Ok((result, artifact))
            }
            Err(e) => {
                self.mark(&repo_path, AnalysisStatus::Failed, IndexUpdate {
                    repo_name,
                    error: Some(e.to_string()),
                    ..Default::default()
                });
                Err(e)
            }
        }
    }

    fn run(
        &self,
        path: &Path,
        repo_name: &str,
        repo_path: &str,
        options: &AnalysisOptions,
    ) -> Result<(RepoAnalysisResult, PathBuf)> {
        let branch = match &options.branch {
            Some(b) => b.clone(),
            None => self.vcs.current_branch(path)?,
        };

        let extract_options = ExtractOptions {
            filter: LogFilter::new(),
            show_progress: options.show_progress,
        };
        let commits = extract_commits(self.vcs, path, &branch, &extract_options)?;

        let mut files = match compute_churn(self.vcs, path, &options.churn_window) {
            Ok(files) => files,
            Err(e) => {
                tracing::warn!(repo = repo_name, error = %e, "churn computation failed");
                Vec::new()
            }
        };
        files.truncate(CHURN_SUMMARY_LIMIT);
        let churn = ChurnSummary {
            since: options.churn_window.clone(),
            files,
        };

        let result = build_result(repo_name, repo_path, &branch, &commits, churn, options.recent_commits);
        let artifact = self.store.write(&result)?;
        Ok((result, artifact))
    }

    fn mark(&self, repo_path: &str, status: AnalysisStatus, update: IndexUpdate) {
        if let Err(e) = self.index.upsert_status(repo_path, status, update) {
            tracing::warn!(repo = repo_path, %status, error = %e, "failed to update repository index");
        }
    }
}

/// Directory name a clone of `url` lands in: the last path segment without `.git`.
pub fn clone_dir_name(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.trim_end_matches(".git").to_string()
}

pub fn exec(
    common: CommonArgs,
    path: Option<PathBuf>,
    url: Option<String>,
    branch: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let vcs = GitCli::new();

    let path = match (path, &url) {
        (Some(p), _) => p,
        (None, Some(u)) => config.clones_dir().join(clone_dir_name(u)),
        (None, None) => std::env::current_dir().context("Failed to read current directory")?,
    };

    if let Some(url) = &url {
        if path.exists() {
            tracing::info!(path = %path.display(), "pulling existing checkout");
            vcs.pull(&path).context("Failed to pull repository")?;
        } else {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).context("Failed to create clone directory")?;
            }
            tracing::info!(url = %url, path = %path.display(), "cloning repository");
            vcs.clone_repo(url, &path).context("Failed to clone repository")?;
        }
    }

    let store = ArtifactStore::new(config.analyses_dir()).context("Failed to open artifact store")?;
    let index = SqliteIndex::open(config.index_path()).context("Failed to open repository index")?;

    let mut options = AnalysisOptions::from_config(&config);
    options.branch = branch;
    options.show_progress = !json;

    let (result, artifact) = RepoAnalyzer::new(&vcs, &store, &index)
        .analyze(&path, &options)
        .with_context(|| format!("Failed to analyze {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        output_summary(&result, &artifact);
    }
    Ok(())
}

fn output_summary(result: &RepoAnalysisResult, artifact: &Path) {
    println!(
        "{} {} ({})",
        style("Repository").bold(),
        style(&result.repo_name).cyan(),
        result.branch
    );
    println!("  Commits:  {}", result.total_commits);
    println!("  Authors:  {}", result.authors.len());
    if let (Some(first), Some(last)) = (result.first_commit, result.last_commit) {
        println!("  History:  {} → {}", first.format("%Y-%m-%d"), last.format("%Y-%m-%d"));
    }
    println!(
        "  Lines:    {} {}",
        style(format!("+{}", result.summary.lines_added)).green(),
        style(format!("-{}", result.summary.lines_removed)).red()
    );

    if !result.summary.contributors.is_empty() {
        println!("\n{}", style("Top contributors").bold());
        for c in result.summary.contributors.iter().take(5) {
            println!("  {:<30} {:<35} {:>6}", crate::util::truncate(&c.name, 30), c.email, c.commits);
        }
    }

    if !result.weekly.is_empty() {
        println!("\n{}", style("Recent weeks").bold());
        let max = result.weekly.iter().map(|w| w.commit_count).max().unwrap_or(1).max(1);
        for w in result.weekly.iter().rev().take(8) {
            let bar_len = (w.commit_count * 30 / max) as usize;
            println!(
                "  {} W{:02} {:>5} {}",
                w.week_start,
                w.iso_week,
                w.commit_count,
                style("█".repeat(bar_len.max(1))).green()
            );
        }
    }

    if !result.churn.files.is_empty() {
        println!("\n{} (since {})", style("Hot files").bold(), result.churn.since);
        for f in result.churn.files.iter().take(5) {
            println!("  {:<50} {:>8}", crate::util::truncate(&f.path, 50), f.total_changes);
        }
    }

    println!("\nSaved to {}", artifact.display());
}
