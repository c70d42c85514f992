use crate::error::Result;
use crate::model::RepoAnalysisResult;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// JSON analysis artifacts, one file per analysis run.
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        Ok(Self {
            dir: dir.as_ref().to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<repo_name>_<timestamp>.json` inside the store directory.
    pub fn artifact_path(&self, result: &RepoAnalysisResult) -> PathBuf {
        let name: String = result
            .repo_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let stamp = result.analyzed_at.format("%Y%m%dT%H%M%S%3f");
        self.dir.join(format!("{name}_{stamp}.json"))
    }

    pub fn write(&self, result: &RepoAnalysisResult) -> Result<PathBuf> {
        let path = self.artifact_path(result);
        let json = serde_json::to_string_pretty(result)?;
        fs::write(&path, json)?;
        tracing::debug!(path = %path.display(), "wrote analysis artifact");
        Ok(path)
    }

    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<RepoAnalysisResult> {
        let data = fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Every `.json` file in the store, sorted by file name.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some("json") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Newest readable artifact per repository path. Unreadable files are
    /// skipped with a warning.
    pub fn load_latest_per_repo(&self) -> Result<Vec<RepoAnalysisResult>> {
        let mut latest: HashMap<String, RepoAnalysisResult> = HashMap::new();

        for path in self.list()? {
            let result = match self.read(&path) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable artifact");
                    continue;
                }
            };
            match latest.get(&result.repo_path) {
                Some(existing) if existing.analyzed_at >= result.analyzed_at => {}
                _ => {
                    latest.insert(result.repo_path.clone(), result);
                }
            }
        }

        let mut results: Vec<_> = latest.into_values().collect();
        results.sort_by(|a, b| a.repo_path.cmp(&b.repo_path));
        Ok(results)
    }
}
