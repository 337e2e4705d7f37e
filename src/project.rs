//! Project resolution and workflow discovery

use crate::fs::FileSystem;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Number of characters of a commit identifier used in file names
pub const SHORT_COMMIT_LEN: usize = 7;

/// Manifest whose absence makes a project suspicious (but not invalid)
pub const PROJECT_MANIFEST: &str = "package.json";

const MAX_IMAGE_TAG_LEN: usize = 128;

/// Image tag used when the recipe name has no usable characters
const DEFAULT_IMAGE_TAG: &str = "reprobox";

const WORKFLOW_DIRS: &[&str] = &[".github/workflows"];
const WORKFLOW_FILES: &[&str] = &[".circleci/config.yml"];

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project path does not exist: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Project path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Cannot derive a project name from {}", .0.display())]
    Unnamed(PathBuf),

    #[error("Failed to resolve project path {}: {reason}", path.display())]
    Unresolvable { path: PathBuf, reason: String },
}

/// Everything about the project that artifact synthesis needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectContext {
    pub root: PathBuf,
    pub name: String,
    pub commit: Option<String>,
    pub output_name: Option<String>,
}

impl ProjectContext {
    pub fn new(root: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            name: name.into(),
            commit: None,
            output_name: None,
        }
    }

    /// Resolve a directory into a project, naming it after the directory
    pub fn from_path(fs: &dyn FileSystem, path: &Path) -> Result<Self, ProjectError> {
        if !fs.exists(path) {
            return Err(ProjectError::NotFound(path.to_path_buf()));
        }
        if !fs.is_dir(path) {
            return Err(ProjectError::NotADirectory(path.to_path_buf()));
        }

        let root = fs
            .canonicalize(path)
            .map_err(|e| ProjectError::Unresolvable {
                path: path.to_path_buf(),
                reason: format!("{:#}", e),
            })?;
        let name = root
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ProjectError::Unnamed(root.clone()))?;

        if !fs.is_file(&root.join(PROJECT_MANIFEST)) {
            warn!(
                project = %name,
                "No {} found; the generated image may not build",
                PROJECT_MANIFEST
            );
        }

        debug!(project = %name, root = %root.display(), "Resolved project");
        Ok(Self::new(root, name))
    }

    pub fn with_commit(mut self, commit: Option<String>) -> Self {
        self.commit = commit.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_output_name(mut self, output_name: Option<String>) -> Self {
        self.output_name = output_name.filter(|n| !n.trim().is_empty());
        self
    }

    /// First seven characters of the commit identifier
    pub fn short_commit(&self) -> Option<&str> {
        self.commit.as_deref().map(|commit| {
            match commit.char_indices().nth(SHORT_COMMIT_LEN) {
                Some((end, _)) => &commit[..end],
                None => commit,
            }
        })
    }

    /// Recipe file name: the explicit output name if given, otherwise
    /// `{name}_{short_commit}.{ext}` or `{name}.{ext}`
    pub fn recipe_file_name(&self, extension: &str) -> String {
        if let Some(name) = &self.output_name {
            return name.clone();
        }
        match self.short_commit() {
            Some(short) => format!("{}_{}.{}", self.name, short, extension),
            None => format!("{}.{}", self.name, extension),
        }
    }

    /// Image tag derived from the recipe file name.
    ///
    /// The result is a valid image repository name: lowercase alphanumerics
    /// joined by single `.`, `_` or `-` separators.
    pub fn image_tag(&self, extension: &str) -> String {
        let file_name = self.recipe_file_name(extension);
        let suffix = format!(".{}", extension);
        let stem = file_name.strip_suffix(&suffix).unwrap_or(&file_name);

        let mut tag = String::with_capacity(stem.len());
        for c in stem.to_lowercase().chars() {
            let c = if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-')
            {
                c
            } else {
                '-'
            };
            let is_separator = !c.is_ascii_alphanumeric();
            if is_separator && (tag.is_empty() || tag.ends_with(['.', '_', '-'])) {
                continue;
            }
            tag.push(c);
        }
        tag.truncate(MAX_IMAGE_TAG_LEN);
        let tag = tag.trim_end_matches(['.', '_', '-']);

        if tag.is_empty() {
            DEFAULT_IMAGE_TAG.to_string()
        } else {
            tag.to_string()
        }
    }
}

/// List the CI workflow files of a project in sorted order
pub fn discover_workflows(fs: &dyn FileSystem, root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for dir in WORKFLOW_DIRS {
        let dir = root.join(dir);
        if !fs.is_dir(&dir) {
            continue;
        }
        match fs.read_dir(&dir) {
            Ok(entries) => found.extend(
                entries
                    .into_iter()
                    .filter(|e| e.is_file())
                    .filter(|e| e.file_name().ends_with(".yml") || e.file_name().ends_with(".yaml"))
                    .map(|e| e.path),
            ),
            Err(e) => warn!(dir = %dir.display(), error = %e, "Could not scan workflow directory"),
        }
    }

    for file in WORKFLOW_FILES {
        let path = root.join(file);
        if fs.is_file(&path) {
            found.push(path);
        }
    }

    found.sort();
    debug!(count = found.len(), "Discovered workflow files");
    found
}
