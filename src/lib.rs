//! reprobox - reproduce a CI workflow job as a local container build
//!
//! This library reads a CI workflow definition, extracts the runtime version
//! and shell commands of one job, and synthesizes a container build recipe
//! plus a context-exclusion file that replay that job locally.
//!
//! # Core Concepts
//!
//! - **Workflow document**: the parsed YAML tree of a CI workflow file
//! - **Build spec**: the normalized runtime version and ordered commands of one job
//! - **Artifacts**: the recipe file and `.dockerignore` generated from a build spec
//! - **Pipeline**: the state machine that selects a job, extracts its build spec, writes
//!   the artifacts and optionally builds and runs the image
//!
//! # Example Usage
//!
//! ```no_run
//! use reprobox::{BuildSpecExtractor, ArtifactSynthesizer, ProjectContext, WorkflowDocument};
//!
//! let document = WorkflowDocument::parse(
//!     "jobs:\n  build:\n    steps:\n      - run: npm ci\n",
//! )?;
//! let extractor = BuildSpecExtractor::default();
//! let jobs = extractor.extract_jobs(&document)?;
//! let spec = extractor.build_spec(jobs.require("build")?);
//!
//! let project = ProjectContext::new("/src/webapp", "webapp");
//! let recipe = ArtifactSynthesizer::default().render_recipe(&spec, &project);
//! println!("{}", recipe);
//! # Ok::<(), reprobox::MalformedDocumentError>(())
//! ```
//!
//! # Project Structure
//!
//! - [`workflow`]: document parsing and build spec extraction
//! - [`recipe`]: recipe and exclusion file synthesis
//! - [`pipeline`]: run orchestration and its state machine
//! - [`project`]: project resolution and workflow discovery
//! - [`executor`] and [`vcs`]: external container and git commands
//! - [`fs`]: file system abstraction with an in-memory implementation for tests

pub mod cli;
pub mod config;
pub mod executor;
pub mod fs;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod recipe;
pub mod util;
pub mod vcs;
pub mod workflow;

pub use config::{ConfigError, ReproConfig};
pub use executor::{BuildExecutor, ContainerCli, ExecutionOutput};
pub use pipeline::{
    PipelineError, PipelineOrchestrator, PipelineOutcome, PipelineRequest, PipelineState,
};
pub use project::{discover_workflows, ProjectContext, ProjectError};
pub use recipe::{ArtifactSynthesizer, GeneratedArtifacts};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use vcs::{CommitResolver, GitCli};
pub use workflow::{BuildSpec, BuildSpecExtractor, JobTable, MalformedDocumentError, WorkflowDocument};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
