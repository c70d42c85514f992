pub mod cli;
pub mod repo;

pub use cli::GitCli;
pub use repo::{parse_log_output, parse_shortstat, GitRepo, LogEntry};

use crate::error::Result;
use crate::model::{DiffSummary, LogFilter};
use std::path::Path;

/// Version-control operations the analysis pipeline depends on.
///
/// Every call may fail independently; callers decide whether a failure is
/// fatal (log retrieval) or recoverable (a single diff).
pub trait VersionControl {
    /// Clone `url` into `dest`.
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()>;

    /// Fast-forward the checkout at `dest` from its upstream.
    fn pull(&self, dest: &Path) -> Result<()>;

    /// Whether `path` is inside a git repository.
    fn check_is_repo(&self, path: &Path) -> bool;

    /// Name of the checked-out branch, or `HEAD` when detached.
    fn current_branch(&self, path: &Path) -> Result<String>;

    /// Whether the repository has at least one commit on any ref.
    fn has_commits(&self, path: &Path) -> Result<bool>;

    /// Commit metadata reachable from `branch`, newest first.
    fn log(&self, path: &Path, branch: &str, filter: &LogFilter) -> Result<Vec<LogEntry>>;

    /// Insertions, deletions and files changed between two revisions.
    fn diff_summary(&self, path: &Path, from: &str, to: &str) -> Result<DiffSummary>;

    /// Raw `--numstat` log output for commits newer than `since`.
    fn raw_numstat(&self, path: &Path, since: &str) -> Result<String>;
}
