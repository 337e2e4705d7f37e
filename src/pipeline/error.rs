use super::state::PipelineState;
use crate::workflow::MalformedDocumentError;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Which generated file an artifact error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Recipe,
    IgnoreFile,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKind::Recipe => f.write_str("recipe file"),
            ArtifactKind::IgnoreFile => f.write_str("exclusion file"),
        }
    }
}

/// External step of a build request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Build,
    Run,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildStage::Build => f.write_str("build"),
            BuildStage::Run => f.write_str("run"),
        }
    }
}

/// Errors that end a pipeline run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    MalformedDocument(#[from] MalformedDocumentError),

    #[error("Failed to write {artifact} {}: {reason}", path.display())]
    ArtifactWrite {
        artifact: ArtifactKind,
        path: PathBuf,
        reason: String,
    },

    #[error("Container {stage} failed with {}{}", exit_label(.exit_code), output_suffix(.output))]
    BuildFailed {
        stage: BuildStage,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("Could not start container {stage}: {reason}")]
    Executor { stage: BuildStage, reason: String },

    #[error("Cannot {operation} while pipeline is {state}")]
    InvalidTransition {
        operation: &'static str,
        state: PipelineState,
    },
}

fn exit_label(exit_code: &Option<i32>) -> String {
    match exit_code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

fn output_suffix(output: &str) -> String {
    if output.trim().is_empty() {
        String::new()
    } else {
        format!(":\n{}", output.trim_end())
    }
}
