use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, DashError>;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("Git discover error: {0}")]
    GitDiscover(#[from] Box<gix::discover::Error>),
    #[error("Git command failed: {0}")]
    GitCommand(String),
    #[error("Failed to execute git: {0}")]
    GitSpawn(std::io::Error),
    #[error("Path does not exist: {}", .0.display())]
    PathNotFound(PathBuf),
    #[error("Not a git repository: {}", .0.display())]
    NotARepository(PathBuf),
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Index error: {0}")]
    Index(String),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid date: {0}")]
    InvalidDate(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Unknown scan: {0}")]
    ScanNotFound(String),
    #[error("Scan {0} stopped unexpectedly")]
    ScanAborted(String),
}

impl From<gix::discover::Error> for DashError {
    fn from(err: gix::discover::Error) -> Self {
        DashError::GitDiscover(Box::new(err))
    }
}

impl DashError {
    /// Errors caused by bad caller input rather than by the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DashError::PathNotFound(_) | DashError::NotARepository(_) | DashError::MissingParameter(_)
        )
    }
}
