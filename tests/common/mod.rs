#![allow(dead_code)]

use chrono::DateTime;
use gitdash::error::{DashError, Result};
use gitdash::git::{LogEntry, VersionControl};
use gitdash::model::{DiffSummary, LogFilter};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Scripted [`VersionControl`] that records the diffs it was asked for.
pub struct MockVcs {
    pub is_repo: bool,
    pub has_commits: bool,
    pub branch: String,
    pub entries: Vec<LogEntry>,
    pub diffs: HashMap<String, DiffSummary>,
    pub failing_diffs: HashSet<String>,
    pub fail_log: bool,
    pub numstat: String,
    pub diff_calls: RefCell<Vec<(String, String)>>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self {
            is_repo: true,
            has_commits: true,
            branch: "main".to_string(),
            entries: Vec::new(),
            diffs: HashMap::new(),
            failing_diffs: HashSet::new(),
            fail_log: false,
            numstat: String::new(),
            diff_calls: RefCell::new(Vec::new()),
        }
    }
}

impl VersionControl for MockVcs {
    fn clone_repo(&self, _url: &str, _dest: &Path) -> Result<()> {
        Ok(())
    }

    fn pull(&self, _dest: &Path) -> Result<()> {
        Ok(())
    }

    fn check_is_repo(&self, _path: &Path) -> bool {
        self.is_repo
    }

    fn current_branch(&self, _path: &Path) -> Result<String> {
        Ok(self.branch.clone())
    }

    fn has_commits(&self, _path: &Path) -> Result<bool> {
        Ok(self.has_commits)
    }

    fn log(&self, _path: &Path, _branch: &str, _filter: &LogFilter) -> Result<Vec<LogEntry>> {
        if self.fail_log {
            return Err(DashError::GitCommand("git log failed: bad revision".to_string()));
        }
        Ok(self.entries.clone())
    }

    fn diff_summary(&self, _path: &Path, from: &str, to: &str) -> Result<DiffSummary> {
        self.diff_calls.borrow_mut().push((from.to_string(), to.to_string()));
        if self.failing_diffs.contains(to) {
            return Err(DashError::GitCommand(format!("git diff {from} {to} failed")));
        }
        Ok(self.diffs.get(to).cloned().unwrap_or_default())
    }

    fn raw_numstat(&self, _path: &Path, _since: &str) -> Result<String> {
        Ok(self.numstat.clone())
    }
}

pub fn entry(hash: &str, author: &str, when: &str, message: &str) -> LogEntry {
    LogEntry {
        hash: hash.to_string(),
        author_name: author.to_string(),
        author_email: format!("{}@example.com", author.to_lowercase()),
        timestamp: DateTime::parse_from_rfc3339(when).unwrap(),
        message: message.to_string(),
    }
}

pub fn diff(insertions: u64, deletions: u64, files_changed: u64) -> DiffSummary {
    DiffSummary {
        insertions,
        deletions,
        files_changed,
    }
}
