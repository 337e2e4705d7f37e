//! Configuration management for reprobox
//!
//! Settings are loaded from environment variables with sensible defaults.
//! Command-line flags override individual values after loading.
//!
//! # Environment Variables
//!
//! - `REPROBOX_FALLBACK_RUNTIME`: Runtime version used when a job declares none - default: "lts"
//! - `REPROBOX_BASE_IMAGE`: Base image template, must contain `{version}` - default: "node:{version}-alpine"
//! - `REPROBOX_WORKDIR_ROOT`: Parent of the working directory inside the image - default: "/app"
//! - `REPROBOX_RECIPE_EXTENSION`: Extension of generated recipe files - default: "Dockerfile"
//! - `REPROBOX_CONTAINER_BINARY`: Container CLI used for build and run - default: "docker"
//! - `REPROBOX_LOG_LEVEL`: Logging level - default: "info"
//!
//! # Example
//!
//! ```no_run
//! use reprobox::ReproConfig;
//!
//! let config = ReproConfig::default();
//! config.validate().expect("Invalid configuration");
//! println!("{}", config);
//! ```

use crate::recipe::synthesizer::VERSION_PLACEHOLDER;
use crate::recipe::{DEFAULT_BASE_IMAGE, DEFAULT_WORKDIR_ROOT};
use crate::workflow::DEFAULT_RUNTIME_VERSION;
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Default values for configuration
pub const DEFAULT_RECIPE_EXTENSION: &str = "Dockerfile";
pub const DEFAULT_CONTAINER_BINARY: &str = "docker";
const DEFAULT_LOG_LEVEL: &str = "info";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Main configuration structure for reprobox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReproConfig {
    /// Runtime version used when a job declares none
    pub fallback_runtime: String,

    /// Base image template containing `{version}`
    pub base_image: String,

    /// Directory under which the project is copied inside the image
    pub workdir_root: String,

    /// Extension of generated recipe files
    pub recipe_extension: String,

    /// Container CLI binary
    pub container_binary: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for ReproConfig {
    /// Loads configuration from `REPROBOX_*` environment variables, falling
    /// back to defaults for anything unset or blank
    fn default() -> Self {
        Self {
            fallback_runtime: env_or("REPROBOX_FALLBACK_RUNTIME", DEFAULT_RUNTIME_VERSION),
            base_image: env_or("REPROBOX_BASE_IMAGE", DEFAULT_BASE_IMAGE),
            workdir_root: env_or("REPROBOX_WORKDIR_ROOT", DEFAULT_WORKDIR_ROOT),
            recipe_extension: env_or("REPROBOX_RECIPE_EXTENSION", DEFAULT_RECIPE_EXTENSION),
            container_binary: env_or("REPROBOX_CONTAINER_BINARY", DEFAULT_CONTAINER_BINARY),
            log_level: env_or("REPROBOX_LOG_LEVEL", DEFAULT_LOG_LEVEL).to_lowercase(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl ReproConfig {
    /// Validates the configuration
    ///
    /// Checks that:
    /// - The base image template contains the `{version}` placeholder
    /// - The working directory root is absolute
    /// - Recipe extension and container binary are non-empty
    /// - Log level is valid
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.base_image.contains(VERSION_PLACEHOLDER) {
            return Err(ConfigError::ValidationFailed(format!(
                "Base image '{}' must contain the {} placeholder",
                self.base_image, VERSION_PLACEHOLDER
            )));
        }

        if !self.workdir_root.starts_with('/') {
            return Err(ConfigError::ValidationFailed(format!(
                "Working directory root '{}' must be an absolute path",
                self.workdir_root
            )));
        }

        if self.recipe_extension.is_empty() || self.recipe_extension.contains('/') {
            return Err(ConfigError::ValidationFailed(
                "Recipe extension must be a non-empty file extension".to_string(),
            ));
        }

        if self.container_binary.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Container binary must not be empty".to_string(),
            ));
        }

        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ConfigError::ValidationFailed(format!(
                    "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                    self.log_level
                )))
            }
        }

        Ok(())
    }

    /// Converts configuration to a display map for output formatting
    pub fn to_display_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert("fallback_runtime".to_string(), self.fallback_runtime.clone());
        map.insert("base_image".to_string(), self.base_image.clone());
        map.insert("workdir_root".to_string(), self.workdir_root.clone());
        map.insert("recipe_extension".to_string(), self.recipe_extension.clone());
        map.insert("container_binary".to_string(), self.container_binary.clone());
        map.insert("log_level".to_string(), self.log_level.clone());
        map
    }
}

impl fmt::Display for ReproConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reprobox Configuration:")?;
        writeln!(f, "  Fallback Runtime: {}", self.fallback_runtime)?;
        writeln!(f, "  Base Image: {}", self.base_image)?;
        writeln!(f, "  Workdir Root: {}", self.workdir_root)?;
        writeln!(f, "  Recipe Extension: {}", self.recipe_extension)?;
        writeln!(f, "  Container Binary: {}", self.container_binary)?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}
