//! Folder scans: find every repository under a root and analyze each one on a
//! background thread, publishing progress through a shared store.

use crate::analysis::{AnalysisOptions, RepoAnalyzer};
use crate::cli::CommonArgs;
use crate::config::Config;
use crate::error::{DashError, Result};
use crate::git::GitCli;
use crate::store::{ArtifactStore, SqliteIndex};
use anyhow::Context;
use chrono::{DateTime, Utc};
use console::style;
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

pub type ScanId = String;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Scanning,
    Analyzing,
    Complete,
    Error,
}

impl ScanStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ScanStatus::Complete | ScanStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScanStatus::Scanning => "scanning",
            ScanStatus::Analyzing => "analyzing",
            ScanStatus::Complete => "complete",
            ScanStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FolderScanProgress {
    pub scan_id: ScanId,
    pub root: PathBuf,
    pub status: ScanStatus,
    pub folders_scanned: u64,
    pub repos_found: u64,
    pub repos_analyzed: u64,
    pub repos_failed: u64,
    pub current_folder: Option<PathBuf>,
    pub message: String,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FolderScanProgress {
    fn new(scan_id: ScanId, root: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            scan_id,
            root,
            status: ScanStatus::Scanning,
            folders_scanned: 0,
            repos_found: 0,
            repos_analyzed: 0,
            repos_failed: 0,
            current_folder: None,
            message: "Scanning for repositories".to_string(),
            error: None,
            started_at: now,
            updated_at: now,
        }
    }
}

/// In-memory registry of scan progress, shared between the scan threads and
/// whoever polls them.
///
/// Finished scans are dropped once they have gone untouched for longer than
/// `ttl`; eviction runs on every access.
#[derive(Clone)]
pub struct ScanProgressStore {
    scans: Arc<Mutex<HashMap<ScanId, FolderScanProgress>>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl ScanProgressStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            scans: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    /// Register a new scan of `root` and return its id.
    pub fn create(&self, root: &Path) -> ScanId {
        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("scan-{}-{seq}", Utc::now().timestamp_millis());
        let mut scans = self.lock();
        evict_expired(&mut scans, self.ttl, Utc::now());
        scans.insert(id.clone(), FolderScanProgress::new(id.clone(), root.to_path_buf()));
        id
    }

    /// Apply `f` to the scan's record, bump its `updated_at` and return the
    /// updated record.
    pub fn update<F>(&self, id: &str, f: F) -> Result<FolderScanProgress>
    where
        F: FnOnce(&mut FolderScanProgress),
    {
        let mut scans = self.lock();
        evict_expired(&mut scans, self.ttl, Utc::now());
        let progress = scans
            .get_mut(id)
            .ok_or_else(|| DashError::ScanNotFound(id.to_string()))?;
        f(progress);
        progress.updated_at = Utc::now();
        Ok(progress.clone())
    }

    pub fn get(&self, id: &str) -> Result<FolderScanProgress> {
        let mut scans = self.lock();
        evict_expired(&mut scans, self.ttl, Utc::now());
        scans
            .get(id)
            .cloned()
            .ok_or_else(|| DashError::ScanNotFound(id.to_string()))
    }

    /// All live scans, oldest first.
    pub fn list(&self) -> Vec<FolderScanProgress> {
        let mut scans = self.lock();
        evict_expired(&mut scans, self.ttl, Utc::now());
        let mut all: Vec<_> = scans.values().cloned().collect();
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at).then_with(|| a.scan_id.cmp(&b.scan_id)));
        all
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<ScanId, FolderScanProgress>> {
        // A panicking scan thread must not take the registry down with it.
        self.scans.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn evict_expired(scans: &mut HashMap<ScanId, FolderScanProgress>, ttl: Duration, now: DateTime<Utc>) {
    let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(365 * 100));
    scans.retain(|_, p| !(p.status.is_terminal() && now.signed_duration_since(p.updated_at) > ttl));
}

/// Directories under `root`, at most `max_depth` levels down, that contain a
/// `.git` entry. Hidden directories are skipped and nothing below a
/// repository is visited.
pub fn discover_repositories(root: &Path, max_depth: usize) -> Result<Vec<PathBuf>> {
    discover_with(root, max_depth, |_| {})
}

/// [`discover_repositories`], calling `on_folder` for every directory visited.
pub fn discover_with<F>(root: &Path, max_depth: usize, mut on_folder: F) -> Result<Vec<PathBuf>>
where
    F: FnMut(&Path),
{
    if !root.is_dir() {
        return Err(DashError::PathNotFound(root.to_path_buf()));
    }

    let mut builder = WalkBuilder::new(root);
    builder
        .standard_filters(false)
        .hidden(true)
        .follow_links(false)
        .max_depth(Some(max_depth))
        .sort_by_file_name(|a, b| a.cmp(b))
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let inside_repo = entry.depth() > 0
                && entry
                    .path()
                    .parent()
                    .is_some_and(|parent| parent.join(".git").exists());
            is_dir && !inside_repo
        });

    let mut repos = Vec::new();
    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(error = %e, "skipping unreadable directory");
                continue;
            }
        };
        let dir = entry.path();
        on_folder(dir);
        if dir.join(".git").exists() {
            tracing::debug!(repo = %dir.display(), "found repository");
            repos.push(dir.to_path_buf());
        }
    }

    Ok(repos)
}

/// Handle to a running scan.
pub struct ScanHandle {
    pub id: ScanId,
    thread: JoinHandle<FolderScanProgress>,
}

impl ScanHandle {
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Block until the scan thread exits and return the scan's final record,
    /// whether or not the progress store still holds it.
    pub fn join(self) -> Result<FolderScanProgress> {
        self.thread
            .join()
            .map_err(|_| DashError::ScanAborted(self.id))
    }
}

pub struct FolderScanner {
    config: Config,
    progress: ScanProgressStore,
}

impl FolderScanner {
    pub fn new(config: Config, progress: ScanProgressStore) -> Self {
        Self { config, progress }
    }

    pub fn progress(&self) -> &ScanProgressStore {
        &self.progress
    }

    /// Start scanning `root` in the background. The returned id can be polled
    /// through the progress store; scans are never cancelled.
    pub fn start(&self, root: &Path, depth: usize) -> Result<ScanHandle> {
        if root.as_os_str().is_empty() {
            return Err(DashError::MissingParameter("root"));
        }
        if !root.is_dir() {
            return Err(DashError::PathNotFound(root.to_path_buf()));
        }

        let id = self.progress.create(root);
        let job = ScanJob {
            id: id.clone(),
            root: root.to_path_buf(),
            depth,
            config: self.config.clone(),
            progress: self.progress.clone(),
        };
        let thread = thread::Builder::new()
            .name(format!("gitdash-{id}"))
            .spawn(move || job.run())?;

        tracing::info!(scan = %id, root = %root.display(), depth, "scan started");
        Ok(ScanHandle { id, thread })
    }
}

struct ScanJob {
    id: ScanId,
    root: PathBuf,
    depth: usize,
    config: Config,
    progress: ScanProgressStore,
}

impl ScanJob {
    fn run(self) -> FolderScanProgress {
        let outcome = self.scan();
        match &outcome {
            Ok(()) => tracing::info!(scan = %self.id, "scan complete"),
            Err(e) => tracing::error!(scan = %self.id, error = %e, "scan failed"),
        }

        let finish = |p: &mut FolderScanProgress| {
            p.current_folder = None;
            match &outcome {
                Ok(()) => {
                    p.status = ScanStatus::Complete;
                    p.message = format!("Analyzed {} of {} repositories", p.repos_analyzed, p.repos_found);
                }
                Err(e) => {
                    p.status = ScanStatus::Error;
                    p.message = "Scan failed".to_string();
                    p.error = Some(e.to_string());
                }
            }
        };
        self.report(&finish).unwrap_or_else(|| {
            let mut last = FolderScanProgress::new(self.id.clone(), self.root.clone());
            finish(&mut last);
            last.updated_at = Utc::now();
            last
        })
    }

    fn scan(&self) -> Result<()> {
        let repos = discover_with(&self.root, self.depth, |dir| {
            self.report(|p| {
                p.folders_scanned += 1;
                p.current_folder = Some(dir.to_path_buf());
            });
        })?;

        let found = repos.len() as u64;
        self.report(|p| {
            p.status = ScanStatus::Analyzing;
            p.repos_found = found;
            p.message = format!("Found {found} repositories");
        });

        // rusqlite connections stay on the thread that opened them.
        let vcs = GitCli::new();
        let store = ArtifactStore::new(self.config.analyses_dir())?;
        let index = SqliteIndex::open(self.config.index_path())?;
        let analyzer = RepoAnalyzer::new(&vcs, &store, &index);
        let options = AnalysisOptions::from_config(&self.config);

        for (n, repo) in repos.iter().enumerate() {
            self.report(|p| {
                p.current_folder = Some(repo.clone());
                p.message = format!("Analyzing {} ({}/{found})", repo.display(), n + 1);
            });

            match analyzer.analyze(repo, &options) {
                Ok(_) => {
                    self.report(|p| p.repos_analyzed += 1);
                }
                Err(e) => {
                    if e.is_input_error() {
                        tracing::debug!(repo = %repo.display(), error = %e, "skipping repository");
                    } else {
                        tracing::warn!(repo = %repo.display(), error = %e, "repository analysis failed");
                    }
                    self.report(|p| p.repos_failed += 1);
                }
            }
        }

        Ok(())
    }

    fn report<F>(&self, f: F) -> Option<FolderScanProgress>
    where
        F: FnOnce(&mut FolderScanProgress),
    {
        match self.progress.update(&self.id, f) {
            Ok(progress) => Some(progress),
            Err(e) => {
                tracing::debug!(scan = %self.id, error = %e, "progress record gone");
                None
            }
        }
    }
}

pub fn exec(common: CommonArgs, root: Option<PathBuf>, depth: Option<usize>, json: bool) -> anyhow::Result<()> {
    let config = Config::load(&common).context("Failed to load configuration")?;
    let root = match root {
        Some(r) => r,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let depth = depth.unwrap_or(config.scan_depth);

    let progress = ScanProgressStore::new(config.scan_ttl);
    let scanner = FolderScanner::new(config, progress.clone());
    let handle = scanner
        .start(&root, depth)
        .with_context(|| format!("Failed to start scan of {}", root.display()))?;

    let pb = if json {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.enable_steady_tick(Duration::from_millis(120));
        pb
    };

    loop {
        if let Ok(current) = progress.get(&handle.id) {
            pb.set_message(current.message.clone());
            if current.status.is_terminal() {
                break;
            }
        }
        if handle.is_finished() {
            break;
        }
        thread::sleep(POLL_INTERVAL);
    }
    pb.finish_and_clear();
    let last = handle.join()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&last)?);
    } else {
        output_summary(&last);
    }

    if last.status == ScanStatus::Error {
        anyhow::bail!(last.error.unwrap_or_else(|| "scan failed".to_string()));
    }
    Ok(())
}

fn output_summary(progress: &FolderScanProgress) {
    let status = match progress.status {
        ScanStatus::Complete => style(progress.status.as_str()).green(),
        ScanStatus::Error => style(progress.status.as_str()).red(),
        _ => style(progress.status.as_str()).yellow(),
    };
    println!("{} {} [{}]", style("Scan").bold(), progress.root.display(), status);
    println!("  Folders scanned:  {}", progress.folders_scanned);
    println!("  Repos found:      {}", progress.repos_found);
    println!("  Repos analyzed:   {}", style(progress.repos_analyzed).green());
    if progress.repos_failed > 0 {
        println!("  Repos failed:     {}", style(progress.repos_failed).red());
    }
    let elapsed = progress.updated_at.signed_duration_since(progress.started_at);
    println!("  Took:             {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
}

