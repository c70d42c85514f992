use super::repo::{parse_log_output, parse_shortstat, GitRepo, LogEntry, LOG_FORMAT};
use super::VersionControl;
use crate::error::{DashError, Result};
use crate::model::{DiffSummary, LogFilter};
use std::path::Path;
use std::process::Command;

/// [`VersionControl`] backed by the `git` executable.
#[derive(Debug, Clone, Default)]
pub struct GitCli;

impl GitCli {
    pub fn new() -> Self {
        Self
    }

    fn run_git(&self, dir: Option<&Path>, args: &[&str]) -> Result<String> {
        let mut cmd = Command::new("git");
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.args(args);

        tracing::trace!(args = %args.join(" "), "running git");
        let output = cmd.output().map_err(DashError::GitSpawn)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DashError::GitCommand(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl VersionControl for GitCli {
    fn clone_repo(&self, url: &str, dest: &Path) -> Result<()> {
        if url.trim().is_empty() {
            return Err(DashError::MissingParameter("url"));
        }
        let dest_str = dest.to_string_lossy();
        self.run_git(None, &["clone", url, &dest_str])?;
        Ok(())
    }

    fn pull(&self, dest: &Path) -> Result<()> {
        self.run_git(Some(dest), &["pull", "--ff-only"])?;
        Ok(())
    }

    fn check_is_repo(&self, path: &Path) -> bool {
        GitRepo::discover(path).is_ok()
    }

    fn current_branch(&self, path: &Path) -> Result<String> {
        match self.run_git(Some(path), &["symbolic-ref", "--short", "-q", "HEAD"]) {
            Ok(name) if !name.trim().is_empty() => Ok(name.trim().to_string()),
            _ => Ok("HEAD".to_string()),
        }
    }

    fn has_commits(&self, path: &Path) -> Result<bool> {
        let output = self.run_git(Some(path), &["rev-list", "-n", "1", "--all"])?;
        Ok(!output.trim().is_empty())
    }

    fn log(&self, path: &Path, branch: &str, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let mut args: Vec<String> = vec!["log".to_string(), LOG_FORMAT.to_string()];
        if let Some(since) = &filter.since {
            args.push(format!("--since={since}"));
        }
        if let Some(max) = filter.max_count {
            args.push(format!("--max-count={max}"));
        }
        args.push(branch.to_string());
        args.push("--".to_string());

        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let output = self.run_git(Some(path), &arg_refs)?;
        parse_log_output(&output)
    }

    fn diff_summary(&self, path: &Path, from: &str, to: &str) -> Result<DiffSummary> {
        let output = self.run_git(Some(path), &["diff", "--shortstat", from, to])?;
        parse_shortstat(&output)
    }

    fn raw_numstat(&self, path: &Path, since: &str) -> Result<String> {
        let since_arg = format!("--since={since}");
        self.run_git(Some(path), &["log", &since_arg, "--numstat", "--format="])
    }
}
