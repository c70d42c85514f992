use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

pub const SCHEMA_VERSION: u32 = 1;

/// Maximum number of commits kept in full detail inside an analysis artifact.
pub const RECENT_COMMIT_LIMIT: usize = 100;

/// One commit as extracted from `git log`, with diff stats against its parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub hash: String,
    pub author_name: String,
    pub author_email: String,
    pub timestamp: DateTime<FixedOffset>,
    pub message: String,
    pub insertions: u64,
    pub deletions: u64,
    pub files_changed: u64,
}

impl CommitRecord {
    pub fn lines_changed(&self) -> u64 {
        self.insertions + self.deletions
    }

    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffSummary {
    pub insertions: u64,
    pub deletions: u64,
    pub files_changed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBucket {
    pub week_start: NaiveDate,
    pub iso_week: u32,
    pub iso_year: i32,
    pub year: i32,
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub authors: Vec<String>,
    pub files_changed: u64,
    pub commit_hashes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyBucket {
    pub year_month: String,
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub authors: Vec<String>,
    pub files_changed: u64,
    pub weeks: Vec<WeeklyBucket>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearlyBucket {
    pub year: i32,
    pub commit_count: u64,
    pub lines_added: u64,
    pub lines_removed: u64,
    pub authors: Vec<String>,
    pub files_changed: u64,
    pub months: Vec<MonthlyBucket>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeBuckets {
    pub weekly: Vec<WeeklyBucket>,
    pub monthly: Vec<MonthlyBucket>,
    pub yearly: Vec<YearlyBucket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
    pub email: String,
    pub commits: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoSummary {
    pub lines_added: u64,
    pub lines_removed: u64,
    pub files_changed: u64,
    pub contributors: Vec<Contributor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileChurn {
    pub path: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub total_changes: u64,
    pub commits: u32,
}

impl FileChurn {
    pub fn new(path: String) -> Self {
        Self {
            path,
            lines_added: 0,
            lines_deleted: 0,
            total_changes: 0,
            commits: 0,
        }
    }

    pub fn add_stats(&mut self, added: u64, deleted: u64) {
        self.lines_added += added;
        self.lines_deleted += deleted;
        self.total_changes += added + deleted;
        self.commits += 1;
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChurnSummary {
    pub since: String,
    pub files: Vec<FileChurn>,
}

/// The persisted artifact for one analyzed repository.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepoAnalysisResult {
    pub version: u32,
    pub repo_name: String,
    pub repo_path: String,
    pub branch: String,
    pub analyzed_at: DateTime<Utc>,
    pub total_commits: u64,
    pub authors: Vec<String>,
    pub first_commit: Option<DateTime<FixedOffset>>,
    pub last_commit: Option<DateTime<FixedOffset>>,
    pub summary: RepoSummary,
    pub weekly: Vec<WeeklyBucket>,
    pub monthly: Vec<MonthlyBucket>,
    pub yearly: Vec<YearlyBucket>,
    pub recent_commits: Vec<CommitRecord>,
    pub churn: ChurnSummary,
}

#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub since: Option<String>,
    pub max_count: Option<usize>,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_since(mut self, since: impl Into<String>) -> Self {
        self.since = Some(since.into());
        self
    }

    pub fn with_max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }
}
