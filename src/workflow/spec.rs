use serde::{Deserialize, Serialize};

/// Runtime version used when a job never declares one
pub const DEFAULT_RUNTIME_VERSION: &str = "lts";

/// Normalized build description extracted from a single CI job.
///
/// `commands` keeps the order of the job's steps; nothing is reordered,
/// deduplicated or merged across jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSpec {
    /// Job this build spec was extracted from
    pub job_name: String,

    /// Raw version identifier as written in the workflow, or the fallback
    pub runtime_version: String,

    /// Whether `runtime_version` came from the workflow rather than the fallback
    pub version_declared: bool,

    /// Shell commands in step order, one per line of each `run` block
    pub commands: Vec<String>,
}

impl BuildSpec {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
