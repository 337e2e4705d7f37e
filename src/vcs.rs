//! Source revision resolution through git

use crate::executor::run_captured;
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info};

#[async_trait]
pub trait CommitResolver: Send + Sync {
    /// Commit currently checked out in `repo`, or `None` when it is not a repository
    async fn current_commit(&self, repo: &Path) -> Result<Option<String>>;

    /// Check out `revision` in `repo`
    async fn checkout(&self, repo: &Path, revision: &str) -> Result<()>;
}

/// Resolver backed by the `git` command line
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn is_repository(repo: &Path) -> bool {
        repo.join(".git").exists()
    }
}

#[async_trait]
impl CommitResolver for GitCli {
    async fn current_commit(&self, repo: &Path) -> Result<Option<String>> {
        if !Self::is_repository(repo) {
            debug!(repo = %repo.display(), "Not a git repository");
            return Ok(None);
        }

        let args = ["rev-parse".to_string(), "HEAD".to_string()];
        let output = run_captured(&self.binary, &args, Some(repo)).await?;
        if !output.success() {
            // Fresh repository without commits
            debug!(stderr = %output.stderr.trim(), "git rev-parse HEAD failed");
            return Ok(None);
        }

        let commit = output.stdout.trim().to_string();
        Ok((!commit.is_empty()).then_some(commit))
    }

    async fn checkout(&self, repo: &Path, revision: &str) -> Result<()> {
        if revision.trim().is_empty() {
            bail!("Cannot check out an empty revision");
        }
        if revision.starts_with('-') {
            bail!("Invalid revision '{}': must not start with '-'", revision);
        }
        if !Self::is_repository(repo) {
            bail!(
                "Cannot check out '{}': {} is not a git repository",
                revision,
                repo.display()
            );
        }

        info!(revision, "Checking out revision");
        // Trailing `--` keeps git from reading the revision as a path
        let args = [
            "checkout".to_string(),
            revision.to_string(),
            "--".to_string(),
        ];
        let output = run_captured(&self.binary, &args, Some(repo)).await?;
        if !output.success() {
            bail!(
                "git checkout {} failed: {}",
                revision,
                output.combined()
            );
        }
        Ok(())
    }
}
