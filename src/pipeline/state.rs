use serde::Serialize;
use std::fmt;

/// Lifecycle of a single pipeline run.
///
/// `BuildComplete` and `Failed` are terminal. A run that never requests a
/// build stops in `ArtifactsWritten`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineState {
    Idle,
    JobSelected,
    SpecBuilt,
    ArtifactsWritten,
    BuildRequested,
    BuildComplete,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::BuildComplete | PipelineState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineState::Idle => "Idle",
            PipelineState::JobSelected => "JobSelected",
            PipelineState::SpecBuilt => "SpecBuilt",
            PipelineState::ArtifactsWritten => "ArtifactsWritten",
            PipelineState::BuildRequested => "BuildRequested",
            PipelineState::BuildComplete => "BuildComplete",
            PipelineState::Failed => "Failed",
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
