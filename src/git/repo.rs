use crate::error::{DashError, Result};
use crate::model::DiffSummary;
use chrono::{DateTime, FixedOffset};
use gix::discover;
use std::path::{Path, PathBuf};

/// Field and record separators used in the `git log` format string.
pub const FIELD_SEP: char = '\x1f';
pub const RECORD_SEP: char = '\x1e';

/// `git log --format` producing one `RECORD_SEP`-terminated record per commit.
pub const LOG_FORMAT: &str = "--format=%H%x1f%an%x1f%ae%x1f%aI%x1f%B%x1e";

/// Commit metadata as returned by `git log`, before diff stats are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
}

/// A discovered repository: the working tree root that git commands run in.
pub struct GitRepo {
    path: PathBuf,
}

impl GitRepo {
    /// Discover the repository containing `path`.
    pub fn discover<P: AsRef<Path>>(path: P) -> Result<Self> {
        let requested = path.as_ref();
        if !requested.exists() {
            return Err(DashError::PathNotFound(requested.to_path_buf()));
        }

        let repo = discover(requested)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> String {
        crate::util::repo_name_from_path(&self.path)
    }
}

/// Parse output produced with [`LOG_FORMAT`].
pub fn parse_log_output(output: &str) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();

    for record in output.split(RECORD_SEP) {
        let record = record.trim_start_matches(['\n', '\r']);
        if record.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = record.splitn(5, FIELD_SEP).collect();
        if fields.len() < 5 {
            return Err(DashError::Parse(format!(
                "Malformed log record: expected 5 fields, found {}",
                fields.len()
            )));
        }

        let timestamp = DateTime::parse_from_rfc3339(fields[3].trim())
            .map_err(|e| DashError::InvalidDate(format!("'{}': {e}", fields[3])))?;

        entries.push(LogEntry {
            hash: fields[0].trim().to_string(),
            author_name: fields[1].to_string(),
            author_email: fields[2].to_string(),
            timestamp,
            message: fields[4].trim_end().to_string(),
        });
    }

    Ok(entries)
}

/// Parse `git diff --shortstat` output, e.g.
/// ` 3 files changed, 10 insertions(+), 2 deletions(-)`.
/// Empty output means the revisions have identical trees.
pub fn parse_shortstat(output: &str) -> Result<DiffSummary> {
    let mut summary = DiffSummary::default();
    let line = output.trim();
    if line.is_empty() {
        return Ok(summary);
    }

    for part in line.split(',') {
        let part = part.trim();
        let (count, label) = part
            .split_once(' ')
            .ok_or_else(|| DashError::Parse(format!("Unexpected shortstat segment '{part}'")))?;
        let count: u64 = count
            .parse()
            .map_err(|_| DashError::Parse(format!("Unexpected shortstat count '{count}'")))?;

        if label.starts_with("file") {
            summary.files_changed = count;
        } else if label.starts_with("insertion") {
            summary.insertions = count;
        } else if label.starts_with("deletion") {
            summary.deletions = count;
        } else {
            return Err(DashError::Parse(format!("Unexpected shortstat segment '{part}'")));
        }
    }

    Ok(summary)
}
