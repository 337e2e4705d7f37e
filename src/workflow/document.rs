//! Parsed workflow documents

use super::error::MalformedDocumentError;
use crate::fs::FileSystem;
use anyhow::{Context, Result};
use serde_yaml::Value;
use std::path::{Path, PathBuf};

/// The raw YAML tree of a CI workflow file.
///
/// The tree is kept as a [`serde_yaml::Value`] so that traversal can cope with
/// the many shapes CI systems accept (a `run` that is a string or a list, a
/// version that is a number, a string or a matrix expression).
#[derive(Debug, Clone, PartialEq)]
pub struct WorkflowDocument {
    root: Value,
    source: Option<PathBuf>,
}

impl WorkflowDocument {
    pub fn new(root: Value) -> Self {
        Self { root, source: None }
    }

    /// Parse a workflow from YAML text
    pub fn parse(content: &str) -> Result<Self, MalformedDocumentError> {
        let root: Value = serde_yaml::from_str(content)?;
        Ok(Self::new(root))
    }

    /// Read and parse a workflow file
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read workflow {}", path.display()))?;
        let mut document = Self::parse(&content)
            .with_context(|| format!("Failed to parse workflow {}", path.display()))?;
        document.source = Some(path.to_path_buf());
        Ok(document)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// File the document was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

/// Short name of a node's shape, used in error messages
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// Render a scalar node as text; numbers keep their YAML spelling
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
