use thiserror::Error;

/// Errors raised while reading jobs out of a workflow document
#[derive(Debug, Error)]
pub enum MalformedDocumentError {
    /// The document is not valid YAML
    #[error("Invalid workflow YAML: {0}")]
    Syntax(#[from] serde_yaml::Error),

    /// The root holds none of the recognised job-container keys
    #[error("No job container found in workflow (expected a top-level {} key)", .expected.join(" or "))]
    MissingJobContainer { expected: Vec<String> },

    /// The job container exists but is not a mapping of jobs
    #[error("Job container '{key}' must be a mapping of jobs, found {found}")]
    InvalidJobContainer { key: String, found: &'static str },

    /// The requested job is not present in the workflow
    #[error("Job '{job}' not found in workflow (available: {})", display_names(.available))]
    JobNotFound { job: String, available: Vec<String> },
}

fn display_names(names: &[String]) -> String {
    if names.is_empty() {
        "none".to_string()
    } else {
        names.join(", ")
    }
}
