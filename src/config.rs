use crate::cli::CommonArgs;
use crate::error::{DashError, Result};
use crate::model::RECENT_COMMIT_LIMIT;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = ".gitdash";
pub const DEFAULT_SCAN_DEPTH: usize = 3;
pub const DEFAULT_SCAN_TTL: &str = "1h";

#[derive(Debug, Clone)]
pub struct Config {
    pub data_dir: PathBuf,
    pub scan_depth: usize,
    pub churn_window: String,
    pub recent_commits: usize,
    pub scan_ttl: Duration,
}

impl Config {
    /// Read settings from `GITDASH_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let data_dir = env::var("GITDASH_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR));

        let scan_depth = match env::var("GITDASH_SCAN_DEPTH") {
            Ok(v) => v
                .parse()
                .map_err(|_| DashError::Config(format!("GITDASH_SCAN_DEPTH is not a number: {v}")))?,
            Err(_) => DEFAULT_SCAN_DEPTH,
        };

        let churn_window = env::var("GITDASH_CHURN_WINDOW")
            .unwrap_or_else(|_| crate::churn::DEFAULT_WINDOW.to_string());

        let recent_commits = env::var("GITDASH_RECENT_COMMITS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(RECENT_COMMIT_LIMIT);

        let ttl = env::var("GITDASH_SCAN_TTL").unwrap_or_else(|_| DEFAULT_SCAN_TTL.to_string());
        let scan_ttl = parse_scan_ttl(&ttl)?;

        Ok(Self {
            data_dir,
            scan_depth,
            churn_window,
            recent_commits,
            scan_ttl,
        })
    }

    /// Environment settings with command-line overrides applied.
    pub fn load(common: &CommonArgs) -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Some(dir) = &common.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }

    pub fn analyses_dir(&self) -> PathBuf {
        self.data_dir.join("analyses")
    }

    pub fn index_path(&self) -> PathBuf {
        self.data_dir.join("index.db")
    }

    pub fn clones_dir(&self) -> PathBuf {
        self.data_dir.join("repos")
    }
}

/// Parses a humantime duration such as `30m`. Zero is rejected.
pub fn parse_scan_ttl(raw: &str) -> Result<Duration> {
    let ttl = humantime::parse_duration(raw)
        .map_err(|e| DashError::Config(format!("GITDASH_SCAN_TTL '{raw}': {e}")))?;
    if ttl.is_zero() {
        return Err(DashError::Config(format!("GITDASH_SCAN_TTL '{raw}' must be greater than zero")));
    }
    Ok(ttl)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            scan_depth: DEFAULT_SCAN_DEPTH,
            churn_window: crate::churn::DEFAULT_WINDOW.to_string(),
            recent_commits: RECENT_COMMIT_LIMIT,
            scan_ttl: Duration::from_secs(3600),
        }
    }
}
