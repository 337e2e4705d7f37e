//! Recipe rendering
//!
//! A recipe is a faithful replay of the extracted job: base image, working
//! directory, a full copy of the build context, then one `RUN` per command.
//! Nothing is added that the job did not run.

use super::ignore::{merge_ignore, render_ignore};
use crate::config::ReproConfig;
use crate::project::ProjectContext;
use crate::workflow::{BuildSpec, DEFAULT_RUNTIME_VERSION};
use serde::Serialize;

/// Placeholder replaced by the normalized runtime version in the base image
pub const VERSION_PLACEHOLDER: &str = "{version}";

pub const DEFAULT_BASE_IMAGE: &str = "node:{version}-alpine";
pub const DEFAULT_WORKDIR_ROOT: &str = "/app";

/// Text of both artifacts for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedArtifacts {
    pub recipe_text: String,
    pub ignore_entries: Vec<String>,
}

impl GeneratedArtifacts {
    pub fn ignore_text(&self) -> String {
        render_ignore(&self.ignore_entries)
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactSynthesizer {
    base_image: String,
    workdir_root: String,
    fallback_version: String,
    extra_ignore: Vec<String>,
}

impl Default for ArtifactSynthesizer {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_IMAGE, DEFAULT_WORKDIR_ROOT, DEFAULT_RUNTIME_VERSION)
    }
}

impl ArtifactSynthesizer {
    pub fn new(
        base_image: impl Into<String>,
        workdir_root: impl Into<String>,
        fallback_version: impl Into<String>,
    ) -> Self {
        Self {
            base_image: base_image.into(),
            workdir_root: workdir_root.into(),
            fallback_version: fallback_version.into(),
            extra_ignore: Vec::new(),
        }
    }

    pub fn from_config(config: &ReproConfig) -> Self {
        Self::new(
            config.base_image.clone(),
            config.workdir_root.clone(),
            config.fallback_runtime.clone(),
        )
    }

    /// Additional exclusion entries merged after the defaults
    pub fn with_extra_ignore(mut self, entries: Vec<String>) -> Self {
        self.extra_ignore = entries;
        self
    }

    /// Base image reference for a raw runtime version
    pub fn base_image_for(&self, raw_version: &str) -> String {
        let version = normalize_version(raw_version, &self.fallback_version);
        self.base_image.replace(VERSION_PLACEHOLDER, &version)
    }

    /// Render the recipe file for `spec`. Identical input gives byte-identical output.
    pub fn render_recipe(&self, spec: &BuildSpec, context: &ProjectContext) -> String {
        let mut recipe = String::new();

        match context.short_commit() {
            Some(short) => recipe.push_str(&format!(
                "# Reproduces CI job '{}' of {} at commit {}\n",
                spec.job_name, context.name, short
            )),
            None => recipe.push_str(&format!(
                "# Reproduces CI job '{}' of {}\n",
                spec.job_name, context.name
            )),
        }

        recipe.push_str(&format!(
            "FROM {}\n\n",
            self.base_image_for(&spec.runtime_version)
        ));
        recipe.push_str(&format!(
            "WORKDIR {}/{}\n\n",
            self.workdir_root.trim_end_matches('/'),
            context.name
        ));
        recipe.push_str("COPY . .\n");

        if spec.commands.is_empty() {
            recipe.push_str(&format!(
                "\n# No run steps were found in job '{}'\n",
                spec.job_name
            ));
            return recipe;
        }

        recipe.push('\n');
        for command in &spec.commands {
            if let Some(directive) = run_directive(command) {
                recipe.push_str(&directive);
                recipe.push('\n');
            }
        }

        recipe
    }

    /// Exclusion entries after merging the existing file content, if any
    pub fn merge_ignore(&self, existing: Option<&str>) -> Vec<String> {
        let lines: Vec<&str> = existing.map(|c| c.lines().collect()).unwrap_or_default();
        merge_ignore(&lines, &self.extra_ignore)
    }

    pub fn synthesize(
        &self,
        spec: &BuildSpec,
        context: &ProjectContext,
        existing_ignore: Option<&str>,
    ) -> GeneratedArtifacts {
        GeneratedArtifacts {
            recipe_text: self.render_recipe(spec, context),
            ignore_entries: self.merge_ignore(existing_ignore),
        }
    }
}

/// Reduce a workflow version string to something usable as an image tag.
///
/// Leading characters that are neither digits nor `.` are stripped, the
/// leading run of digits and dots is kept and trailing dots are dropped
/// (`v18` → `18`, `20.x` → `20`, `>=18 <21` → `18`). When nothing is left the
/// fallback is returned.
pub fn normalize_version(raw: &str, fallback: &str) -> String {
    let is_version_char = |c: char| c.is_ascii_digit() || c == '.';

    let trimmed = raw.trim_start_matches(|c: char| !is_version_char(c));
    let end = trimmed
        .find(|c: char| !is_version_char(c))
        .unwrap_or(trimmed.len());
    let version = trimmed[..end].trim_matches('.');

    if version.is_empty() {
        fallback.to_string()
    } else {
        version.to_string()
    }
}

/// `RUN` directive for one command. Embedded newlines become line
/// continuations; every line but the last is chained with `&&` unless it
/// already ends in a backslash.
fn run_directive(command: &str) -> Option<String> {
    if !command.contains('\n') {
        return (!command.trim().is_empty()).then(|| format!("RUN {}", command));
    }

    let lines: Vec<&str> = command
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    let last = lines.len().checked_sub(1)?;

    let mut directive = String::from("RUN ");
    for (index, line) in lines.iter().enumerate() {
        if index > 0 {
            directive.push_str("\n    ");
        }
        directive.push_str(line);
        if index < last && !line.ends_with('\\') {
            directive.push_str(" && \\");
        }
    }
    Some(directive)
}
