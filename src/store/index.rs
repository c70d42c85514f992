use crate::error::{DashError, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

pub const INDEX_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisStatus {
    Pending,
    Analyzing,
    Completed,
    Failed,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Analyzing => "analyzing",
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = DashError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "analyzing" => Ok(AnalysisStatus::Analyzing),
            "completed" => Ok(AnalysisStatus::Completed),
            "failed" => Ok(AnalysisStatus::Failed),
            other => Err(DashError::Index(format!("Unknown status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub repo_path: String,
    pub repo_name: String,
    pub output_file: Option<String>,
    pub status: AnalysisStatus,
    pub branch: Option<String>,
    pub last_analyzed: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Fields written alongside a status change. `None` keeps the stored value,
/// except `error`, which is always replaced.
#[derive(Debug, Clone, Default)]
pub struct IndexUpdate {
    pub repo_name: String,
    pub output_file: Option<String>,
    pub branch: Option<String>,
    pub error: Option<String>,
}

/// Metadata about every repository known to the dashboard.
pub trait RepositoryIndex {
    fn list_by_status(&self, status: AnalysisStatus) -> Result<Vec<IndexEntry>>;

    fn list_all(&self) -> Result<Vec<IndexEntry>>;

    fn get(&self, repo_path: &str) -> Result<Option<IndexEntry>>;

    fn upsert_status(&self, repo_path: &str, status: AnalysisStatus, update: IndexUpdate) -> Result<()>;
}

/// [`RepositoryIndex`] stored in a SQLite database.
pub struct SqliteIndex {
    conn: Connection,
}

impl SqliteIndex {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(db_path.as_ref())?;
        let mut index = Self { conn };
        index.initialize()?;
        Ok(index)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let mut index = Self { conn };
        index.initialize()?;
        Ok(index)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS repositories (
                repo_path TEXT PRIMARY KEY,
                repo_name TEXT NOT NULL,
                output_file TEXT,
                status TEXT NOT NULL,
                branch TEXT,
                last_analyzed INTEGER,
                error TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_repositories_status ON repositories(status);
            ",
        )?;
        self.check_schema_version()?;
        Ok(())
    }

    fn check_schema_version(&mut self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {INDEX_SCHEMA_VERSION};");
            self.conn.execute_batch(&set_stmt)?;
        } else if user_version != INDEX_SCHEMA_VERSION as i64 {
            return Err(DashError::Index(format!(
                "Schema version mismatch: expected {}, found {}",
                INDEX_SCHEMA_VERSION, user_version
            )));
        }

        Ok(())
    }

    fn query_entries(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<IndexEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_entry)?;
        let mut entries = Vec::new();
        for row in rows {
            entries.push(row?);
        }
        Ok(entries)
    }
}

const SELECT_ENTRY: &str =
    "SELECT repo_path, repo_name, output_file, status, branch, last_analyzed, error FROM repositories";

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<IndexEntry> {
    let status_text: String = row.get(3)?;
    let status = status_text.parse::<AnalysisStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())),
        )
    })?;

    let last_analyzed = match row.get::<_, Option<i64>>(5)? {
        Some(ts) => Some(Utc.timestamp_opt(ts, 0).single().ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(
                5,
                "last_analyzed".to_string(),
                rusqlite::types::Type::Integer,
            )
        })?),
        None => None,
    };

    Ok(IndexEntry {
        repo_path: row.get(0)?,
        repo_name: row.get(1)?,
        output_file: row.get(2)?,
        status,
        branch: row.get(4)?,
        last_analyzed,
        error: row.get(6)?,
    })
}

impl RepositoryIndex for SqliteIndex {
    fn list_by_status(&self, status: AnalysisStatus) -> Result<Vec<IndexEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE status = ?1 ORDER BY repo_path");
        self.query_entries(&sql, params![status.as_str()])
    }

    fn list_all(&self) -> Result<Vec<IndexEntry>> {
        let sql = format!("{SELECT_ENTRY} ORDER BY repo_path");
        self.query_entries(&sql, params![])
    }

    fn get(&self, repo_path: &str) -> Result<Option<IndexEntry>> {
        let sql = format!("{SELECT_ENTRY} WHERE repo_path = ?1");
        let entry = self
            .conn
            .query_row(&sql, params![repo_path], row_to_entry)
            .optional()?;
        Ok(entry)
    }

    fn upsert_status(&self, repo_path: &str, status: AnalysisStatus, update: IndexUpdate) -> Result<()> {
        if repo_path.is_empty() {
            return Err(DashError::MissingParameter("repo_path"));
        }

        let analyzed_at = (status == AnalysisStatus::Completed).then(|| Utc::now().timestamp());
        self.conn.execute(
            "INSERT INTO repositories (repo_path, repo_name, output_file, status, branch, last_analyzed, error)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(repo_path) DO UPDATE SET
                repo_name = excluded.repo_name,
                output_file = COALESCE(excluded.output_file, repositories.output_file),
                status = excluded.status,
                branch = COALESCE(excluded.branch, repositories.branch),
                last_analyzed = COALESCE(excluded.last_analyzed, repositories.last_analyzed),
                error = excluded.error",
            params![
                repo_path,
                update.repo_name,
                update.output_file,
                status.as_str(),
                update.branch,
                analyzed_at,
                update.error,
            ],
        )?;
        Ok(())
    }
}
