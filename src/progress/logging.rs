//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { project, job } => {
                info!(project = %project, job = %job, "Starting pipeline");
            }
            ProgressEvent::StageStarted { stage } => {
                debug!(stage = %stage, "Entering stage");
            }
            ProgressEvent::StageComplete { stage, duration } => {
                info!(
                    stage = %stage,
                    duration_ms = duration.as_millis(),
                    "Stage complete"
                );
            }
            ProgressEvent::ArtifactWritten { path } => {
                info!(path = %path, "Wrote artifact");
            }
            ProgressEvent::CommandStarted { command } => {
                info!(command = %command, "Executing");
            }
            ProgressEvent::CommandFinished {
                command,
                exit_code,
                duration,
            } => {
                if *exit_code == Some(0) {
                    debug!(
                        command = %command,
                        duration_ms = duration.as_millis(),
                        "Command succeeded"
                    );
                } else {
                    warn!(
                        command = %command,
                        exit_code = ?exit_code,
                        duration_ms = duration.as_millis(),
                        "Command failed"
                    );
                }
            }
            ProgressEvent::Completed { state, total_time } => {
                info!(
                    state = %state,
                    total_time_ms = total_time.as_millis(),
                    "Pipeline complete"
                );
            }
            ProgressEvent::Failed { stage, error } => {
                warn!(stage = %stage, error = %error, "Pipeline failed");
            }
        }
    }
}
