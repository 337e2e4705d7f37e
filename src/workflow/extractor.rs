//! Job and build-spec extraction from workflow documents
//!
//! Workflow files are only loosely schematized: GitHub Actions writes `run` as a
//! string, CircleCI nests it under `command`, versions show up as numbers,
//! strings, lists or `${{ matrix.* }}` expressions. Every lookup here checks
//! the node's shape before using it and silently skips anything unexpected.

use super::document::{scalar_to_string, value_kind, WorkflowDocument};
use super::error::MalformedDocumentError;
use super::spec::{BuildSpec, DEFAULT_RUNTIME_VERSION};
use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Top-level keys that hold the job table
pub const JOB_CONTAINER_KEYS: &[&str] = &["jobs"];

/// Key holding a job's ordered step list
pub const STEP_LIST_KEY: &str = "steps";

/// Step fields that carry shell commands, in lookup order
pub const COMMAND_KEYS: &[&str] = &["run", "script"];

/// Fields that declare the runtime version under a setup step or matrix
pub const VERSION_KEYS: &[&str] = &["node-version"];

/// One job entry of a workflow
#[derive(Debug, Clone, PartialEq)]
pub struct JobDefinition {
    pub name: String,
    pub steps: Vec<Value>,
    pub matrix: Option<Mapping>,
}

impl JobDefinition {
    fn from_value(name: String, value: &Value) -> Self {
        let steps = value
            .get(STEP_LIST_KEY)
            .and_then(Value::as_sequence)
            .cloned()
            .unwrap_or_default();

        let matrix = value
            .get("strategy")
            .and_then(|s| s.get("matrix"))
            .and_then(Value::as_mapping)
            .cloned();

        Self {
            name,
            steps,
            matrix,
        }
    }
}

/// Jobs of a workflow in document order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobTable {
    jobs: Vec<JobDefinition>,
}

impl JobTable {
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.jobs.iter().map(|j| j.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.name == name)
    }

    /// Look up a job, failing with the list of available names when absent
    pub fn require(&self, name: &str) -> Result<&JobDefinition, MalformedDocumentError> {
        self.get(name)
            .ok_or_else(|| MalformedDocumentError::JobNotFound {
                job: name.to_string(),
                available: self.names(),
            })
    }

    pub fn iter(&self) -> impl Iterator<Item = &JobDefinition> {
        self.jobs.iter()
    }
}

/// Turns workflow documents into job tables and build specs
#[derive(Debug, Clone)]
pub struct BuildSpecExtractor {
    fallback_version: String,
}

impl Default for BuildSpecExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_RUNTIME_VERSION)
    }
}

impl BuildSpecExtractor {
    pub fn new(fallback_version: impl Into<String>) -> Self {
        Self {
            fallback_version: fallback_version.into(),
        }
    }

    pub fn fallback_version(&self) -> &str {
        &self.fallback_version
    }

    /// Read the job table out of a workflow document.
    ///
    /// Fails when the root has no job container; an empty or `null` container
    /// yields an empty table.
    pub fn extract_jobs(
        &self,
        document: &WorkflowDocument,
    ) -> Result<JobTable, MalformedDocumentError> {
        let missing = || MalformedDocumentError::MissingJobContainer {
            expected: JOB_CONTAINER_KEYS.iter().map(|k| k.to_string()).collect(),
        };

        let root = document.root().as_mapping().ok_or_else(missing)?;
        let (key, container) = JOB_CONTAINER_KEYS
            .iter()
            .find_map(|key| root.get(*key).map(|value| (*key, value)))
            .ok_or_else(missing)?;

        let entries = match container {
            Value::Null => return Ok(JobTable::default()),
            Value::Mapping(entries) => entries,
            other => {
                return Err(MalformedDocumentError::InvalidJobContainer {
                    key: key.to_string(),
                    found: value_kind(other),
                })
            }
        };

        let mut jobs = Vec::with_capacity(entries.len());
        for (name, value) in entries {
            let Some(name) = scalar_to_string(name) else {
                debug!("Skipping job with non-scalar name");
                continue;
            };
            jobs.push(JobDefinition::from_value(name, value));
        }

        debug!(count = jobs.len(), "Extracted jobs from workflow");
        Ok(JobTable { jobs })
    }

    /// Normalize one job into a [`BuildSpec`].
    ///
    /// The first version declaration found in step order wins; a `node-version`
    /// list in the job matrix is used when no step declares one.
    pub fn build_spec(&self, job: &JobDefinition) -> BuildSpec {
        let mut version: Option<String> = None;
        let mut commands = Vec::new();

        for (index, step) in job.steps.iter().enumerate() {
            if !step.is_mapping() {
                trace!(job = %job.name, index, "Skipping non-mapping step");
                continue;
            }

            if version.is_none() {
                version = step_version(step, job.matrix.as_ref());
                if let Some(v) = &version {
                    debug!(job = %job.name, version = %v, step = index, "Detected runtime version");
                }
            }

            collect_commands(step, &mut commands);
        }

        if version.is_none() {
            version = job.matrix.as_ref().and_then(matrix_version);
        }

        let version_declared = version.is_some();
        BuildSpec {
            job_name: job.name.clone(),
            runtime_version: version.unwrap_or_else(|| self.fallback_version.clone()),
            version_declared,
            commands,
        }
    }
}

fn step_version(step: &Value, matrix: Option<&Mapping>) -> Option<String> {
    let with = step.get("with")?.as_mapping()?;
    VERSION_KEYS
        .iter()
        .filter_map(|key| with.get(*key))
        .find_map(|value| resolve_version(value, matrix))
}

fn matrix_version(matrix: &Mapping) -> Option<String> {
    VERSION_KEYS
        .iter()
        .filter_map(|key| matrix.get(*key))
        .find_map(|value| resolve_version(value, None))
}

/// Resolve a version node to text. Lists contribute their first entry and
/// `${{ matrix.<key> }}` expressions are looked up in the job matrix.
fn resolve_version(value: &Value, matrix: Option<&Mapping>) -> Option<String> {
    let value = match value {
        Value::Sequence(items) => items.first()?,
        other => other,
    };

    let text = scalar_to_string(value)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(captures) = matrix_expression().captures(text) {
        let key = &captures[1];
        return matrix
            .and_then(|m| m.get(key))
            .and_then(|entry| resolve_version(entry, None));
    }

    if text.contains("${{") {
        return None;
    }

    Some(text.to_string())
}

fn matrix_expression() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\$\{\{\s*matrix\.([A-Za-z0-9_-]+)\s*\}\}$").expect("valid regex")
    })
}

fn collect_commands(step: &Value, commands: &mut Vec<String>) {
    let Some(field) = COMMAND_KEYS.iter().find_map(|key| step.get(*key)) else {
        return;
    };

    match field {
        Value::Sequence(items) => {
            commands.extend(items.iter().filter_map(scalar_to_string));
        }
        Value::Mapping(_) => {
            if let Some(command) = field.get("command").and_then(Value::as_str) {
                push_lines(command, commands);
            }
        }
        other => {
            if let Some(text) = scalar_to_string(other) {
                push_lines(&text, commands);
            }
        }
    }
}

fn push_lines(block: &str, commands: &mut Vec<String>) {
    commands.extend(
        block
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string),
    );
}
