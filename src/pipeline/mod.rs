//! Pipeline sequencing extraction, synthesis and the optional container build

pub mod error;
pub mod orchestrator;
pub mod state;

pub use error::{ArtifactKind, BuildStage, PipelineError};
pub use orchestrator::{
    BuildReport, PipelineOrchestrator, PipelineOutcome, PipelineRequest, WrittenArtifacts,
};
pub use state::PipelineState;
