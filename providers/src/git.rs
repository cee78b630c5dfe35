//! Workspace git metadata: remote URL and current branch.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;

use crate::ProviderFut;

const GIT_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitInfo {
    /// Browsable https URL of `origin`.
    pub remote_url: String,
    pub branch: String,
}

#[derive(Debug, Error)]
pub enum GitError {
    #[error("{0} not found in PATH")]
    NotInstalled(&'static str),
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {command} timed out after {timeout_ms}ms")]
    Timeout { command: String, timeout_ms: u64 },
    #[error("git {command} failed: {stderr}")]
    Failed { command: String, stderr: String },
    #[error("git {command} printed nothing")]
    EmptyOutput { command: String },
}

/// One-shot lookup of repository metadata for a workspace root.
pub trait GitResolver: Send + Sync {
    fn resolve<'a>(&'a self, root: &'a Path) -> ProviderFut<'a, Result<GitInfo, GitError>>;
}

/// Shells out to the `git` binary.
#[derive(Debug, Clone)]
pub struct GitCli {
    timeout: Duration,
}

impl Default for GitCli {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(GIT_TIMEOUT_MS),
        }
    }
}

impl GitCli {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn run(&self, git_bin: &Path, root: &Path, args: &[&str]) -> Result<String, GitError> {
        let command = args.join(" ");
        let output = Command::new(git_bin)
            .arg("-C")
            .arg(root)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| GitError::Timeout {
                command: command.clone(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })??;

        if !output.status.success() {
            return Err(GitError::Failed {
                command,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if stdout.is_empty() {
            return Err(GitError::EmptyOutput { command });
        }
        Ok(stdout)
    }
}

impl GitResolver for GitCli {
    fn resolve<'a>(&'a self, root: &'a Path) -> ProviderFut<'a, Result<GitInfo, GitError>> {
        Box::pin(async move {
            let bare_name = if cfg!(windows) { "git.exe" } else { "git" };
            let git_bin: PathBuf =
                which::which(bare_name).map_err(|_| GitError::NotInstalled(bare_name))?;

            let remote = self
                .run(&git_bin, root, &["remote", "get-url", "origin"])
                .await?;
            let branch = self
                .run(&git_bin, root, &["rev-parse", "--abbrev-ref", "HEAD"])
                .await?;

            Ok(GitInfo {
                remote_url: normalize_remote_url(&remote),
                branch,
            })
        })
    }
}

/// Turn a clone URL into something a browser can open.
///
/// `git@host:owner/repo.git` and `ssh://git@host/owner/repo.git` become
/// `https://host/owner/repo`. A trailing `.git` is always stripped.
#[must_use]
pub fn normalize_remote_url(remote: &str) -> String {
    let remote = remote.trim();
    let https = if let Some(rest) = remote.strip_prefix("ssh://") {
        let rest = rest.split_once('@').map_or(rest, |(_, host_path)| host_path);
        format!("https://{rest}")
    } else if let Some((user_host, path)) = remote.split_once(':')
        && !remote.contains("://")
    {
        let host = user_host.split_once('@').map_or(user_host, |(_, host)| host);
        format!("https://{host}/{path}")
    } else {
        remote.to_string()
    };
    if let Some(trimmed) = https.strip_suffix(".git") {
        return trimmed.to_string();
    }
    https
}
