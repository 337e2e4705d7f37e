//! External process execution for container builds
//!
//! The pipeline only talks to [`BuildExecutor`]; [`ContainerCli`] drives a
//! docker-compatible command line. No timeout is applied: a hung build blocks
//! the run until the process exits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// Exit status and captured output of an external command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionOutput {
    /// Process exit code; `None` when terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExecutionOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// stdout followed by stderr, skipping empty streams
    pub fn combined(&self) -> String {
        [self.stdout.trim_end(), self.stderr.trim_end()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
pub trait BuildExecutor: Send + Sync {
    /// Build an image tagged `tag` from `recipe` with `context_dir` as build context
    async fn build(&self, recipe: &Path, context_dir: &Path, tag: &str) -> Result<ExecutionOutput>;

    /// Run a container from `image`, removing it on exit
    async fn run(&self, image: &str) -> Result<ExecutionOutput>;

    /// Human-readable form of the build invocation, for logs
    fn describe_build(&self, recipe: &Path, context_dir: &Path, tag: &str) -> String;

    /// Human-readable form of the run invocation, for logs
    fn describe_run(&self, image: &str) -> String;
}

/// Docker-compatible CLI executor (`docker`, `podman`, ...)
#[derive(Debug, Clone)]
pub struct ContainerCli {
    binary: String,
}

impl ContainerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn build_args(recipe: &Path, context_dir: &Path, tag: &str) -> Vec<String> {
        vec![
            "build".to_string(),
            "-t".to_string(),
            tag.to_string(),
            "-f".to_string(),
            recipe.display().to_string(),
            context_dir.display().to_string(),
        ]
    }

    fn run_args(image: &str) -> Vec<String> {
        vec!["run".to_string(), "--rm".to_string(), image.to_string()]
    }
}

#[async_trait]
impl BuildExecutor for ContainerCli {
    async fn build(&self, recipe: &Path, context_dir: &Path, tag: &str) -> Result<ExecutionOutput> {
        run_captured(&self.binary, &Self::build_args(recipe, context_dir, tag), None).await
    }

    async fn run(&self, image: &str) -> Result<ExecutionOutput> {
        run_captured(&self.binary, &Self::run_args(image), None).await
    }

    fn describe_build(&self, recipe: &Path, context_dir: &Path, tag: &str) -> String {
        format!(
            "{} {}",
            self.binary,
            Self::build_args(recipe, context_dir, tag).join(" ")
        )
    }

    fn describe_run(&self, image: &str) -> String {
        format!("{} {}", self.binary, Self::run_args(image).join(" "))
    }
}

/// Run `program` to completion and capture its output
pub(crate) async fn run_captured(
    program: &str,
    args: &[String],
    cwd: Option<&Path>,
) -> Result<ExecutionOutput> {
    let mut command = Command::new(program);
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    debug!(program, ?args, "Spawning process");
    let output = command.output().await.with_context(|| {
        format!(
            "Failed to execute '{}'. Is it installed and on your PATH?",
            program
        )
    })?;

    Ok(ExecutionOutput {
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}
