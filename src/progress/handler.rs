//! Progress handler trait and events

use std::time::Duration;

/// Events emitted while a pipeline run advances
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started for a project and job
    Started { project: String, job: String },

    /// A pipeline stage started
    StageStarted { stage: String },

    /// A pipeline stage completed
    StageComplete { stage: String, duration: Duration },

    /// An artifact file was committed to disk
    ArtifactWritten { path: String },

    /// An external command is about to run
    CommandStarted { command: String },

    /// An external command exited
    CommandFinished {
        command: String,
        exit_code: Option<i32>,
        duration: Duration,
    },

    /// Run finished successfully in the given state
    Completed { state: String, total_time: Duration },

    /// Run failed during a stage
    Failed { stage: String, error: String },
}

/// Trait for handling progress events
pub trait ProgressHandler: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
