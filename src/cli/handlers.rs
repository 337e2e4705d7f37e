//! Command handlers
//!
//! Each handler returns the process exit code: 0 on success, 1 when the run
//! failed and 2 when the selection was ambiguous or the invocation unusable.

use super::commands::{ConfigArgs, GenerateArgs, JobsArgs};
use super::output::{GenerationReport, JobListing, OutputFormat, OutputFormatter};
use crate::config::ReproConfig;
use crate::fs::{FileSystem, RealFileSystem};
use crate::pipeline::{PipelineOrchestrator, PipelineRequest};
use crate::progress::LoggingHandler;
use crate::project::{discover_workflows, ProjectContext};
use crate::recipe::ArtifactSynthesizer;
use crate::vcs::{CommitResolver, GitCli};
use crate::workflow::{BuildSpecExtractor, WorkflowDocument};
use anyhow::{anyhow, Context, Result};
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug, Error)]
enum HandlerError {
    #[error("{what} is ambiguous; choose one with {flag}:\n{}", list_candidates(.candidates))]
    Ambiguous {
        what: &'static str,
        flag: &'static str,
        candidates: Vec<String>,
    },

    #[error("{0}")]
    Usage(String),

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

impl HandlerError {
    fn exit_code(&self) -> i32 {
        match self {
            HandlerError::Ambiguous { .. } | HandlerError::Usage(_) => EXIT_USAGE,
            HandlerError::Failed(_) => EXIT_FAILURE,
        }
    }
}

fn list_candidates(candidates: &[String]) -> String {
    candidates
        .iter()
        .map(|c| format!("  - {}", c))
        .collect::<Vec<_>>()
        .join("\n")
}

pub async fn handle_generate(args: &GenerateArgs) -> i32 {
    let format = OutputFormat::from(args.format);
    match run_generate(args).await {
        Ok(report) => print_or_fail(OutputFormatter::new(format).format_generation(&report)),
        Err(e) => report_error(e),
    }
}

pub async fn handle_jobs(args: &JobsArgs) -> i32 {
    let format = OutputFormat::from(args.format);
    match run_jobs(args) {
        Ok(listing) => match OutputFormatter::new(format).format_jobs(&listing) {
            Ok(output) => {
                println!("{}", output);
                EXIT_SUCCESS
            }
            Err(e) => report_error(HandlerError::Usage(e.to_string())),
        },
        Err(e) => report_error(e),
    }
}

pub fn handle_config(args: &ConfigArgs) -> i32 {
    let config = ReproConfig::default();
    if let Err(e) = config.validate() {
        return report_error(HandlerError::Failed(e.into()));
    }
    match OutputFormatter::new(args.format.into()).format_config(&config) {
        Ok(output) => {
            println!("{}", output);
            EXIT_SUCCESS
        }
        Err(e) => report_error(HandlerError::Usage(e.to_string())),
    }
}

async fn run_generate(args: &GenerateArgs) -> Result<GenerationReport, HandlerError> {
    let config = ReproConfig::default();
    config.validate().map_err(anyhow::Error::from)?;
    debug!("{}", config);

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem::new());
    let project = resolve_project(fs.as_ref(), args.project_path.as_deref())?;

    let commit = resolve_commit(&GitCli::default(), &project.root, args.commit.as_deref()).await?;
    let project = project
        .with_commit(commit)
        .with_output_name(args.output_name.clone());

    let workflow = select_workflow(fs.as_ref(), &project.root, args.workflow.as_deref())?;
    let document = WorkflowDocument::load(fs.as_ref(), &workflow)?;

    let extractor = BuildSpecExtractor::new(config.fallback_runtime.clone());
    let job = select_job(&extractor, &document, args.job.as_deref())?;

    let output_dir = match &args.output_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("Failed to determine current directory")?,
    };

    let synthesizer =
        ArtifactSynthesizer::from_config(&config).with_extra_ignore(args.extra_ignore.clone());
    let mut orchestrator = PipelineOrchestrator::from_config(fs, &config)
        .with_synthesizer(synthesizer)
        .with_progress_handler(Arc::new(LoggingHandler));

    let request = PipelineRequest {
        document,
        job,
        project: project.clone(),
        output_dir,
        build: args.build,
        run: args.run,
    };
    let outcome = orchestrator
        .execute(request)
        .await
        .map_err(anyhow::Error::from)?;

    Ok(GenerationReport::new(&project, &workflow, outcome))
}

fn run_jobs(args: &JobsArgs) -> Result<JobListing, HandlerError> {
    let config = ReproConfig::default();
    let fs = RealFileSystem::new();

    let project = resolve_project(&fs, args.project_path.as_deref())?;
    let workflow = select_workflow(&fs, &project.root, args.workflow.as_deref())?;
    let document = WorkflowDocument::load(&fs, &workflow)?;

    let extractor = BuildSpecExtractor::new(config.fallback_runtime);
    let table = extractor
        .extract_jobs(&document)
        .map_err(anyhow::Error::from)?;

    Ok(JobListing::new(&workflow, &table, &extractor))
}

fn resolve_project(fs: &dyn FileSystem, path: Option<&Path>) -> Result<ProjectContext> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => env::current_dir().context("Failed to determine current directory")?,
    };
    Ok(ProjectContext::from_path(fs, &path)?)
}

/// Check out `revision` when given, then report the commit the project is at
async fn resolve_commit(
    resolver: &dyn CommitResolver,
    repo: &Path,
    revision: Option<&str>,
) -> Result<Option<String>> {
    if let Some(revision) = revision {
        resolver
            .checkout(repo, revision)
            .await
            .with_context(|| format!("Failed to check out '{}'", revision))?;
        let resolved = resolver.current_commit(repo).await?;
        return Ok(resolved.or_else(|| Some(revision.to_string())));
    }

    match resolver.current_commit(repo).await {
        Ok(commit) => Ok(commit),
        Err(e) => {
            warn!(error = %e, "Could not determine current commit");
            Ok(None)
        }
    }
}

fn select_workflow(
    fs: &dyn FileSystem,
    root: &Path,
    explicit: Option<&Path>,
) -> Result<PathBuf, HandlerError> {
    if let Some(path) = explicit {
        let in_project = root.join(path);
        let resolved = if path.is_absolute() || !fs.is_file(&in_project) {
            path.to_path_buf()
        } else {
            in_project
        };
        if !fs.is_file(&resolved) {
            return Err(anyhow!("Workflow file not found: {}", path.display()).into());
        }
        return Ok(resolved);
    }

    let mut candidates = discover_workflows(fs, root);
    match candidates.len() {
        0 => Err(anyhow!(
            "No workflow files found in {} (looked in .github/workflows and .circleci)",
            root.display()
        )
        .into()),
        1 => {
            let workflow = candidates.remove(0);
            info!(workflow = %workflow.display(), "Using the only workflow file");
            Ok(workflow)
        }
        _ => Err(HandlerError::Ambiguous {
            what: "Workflow file",
            flag: "--workflow",
            candidates: candidates
                .iter()
                .map(|p| p.strip_prefix(root).unwrap_or(p).display().to_string())
                .collect(),
        }),
    }
}

fn select_job(
    extractor: &BuildSpecExtractor,
    document: &WorkflowDocument,
    explicit: Option<&str>,
) -> Result<String, HandlerError> {
    if let Some(job) = explicit {
        return Ok(job.to_string());
    }

    let table = extractor
        .extract_jobs(document)
        .map_err(anyhow::Error::from)?;
    let mut names = table.names();
    match names.len() {
        0 => Err(anyhow!("Workflow defines no jobs").into()),
        1 => {
            let job = names.remove(0);
            info!(job = %job, "Using the only job");
            Ok(job)
        }
        _ => Err(HandlerError::Ambiguous {
            what: "Job",
            flag: "--job",
            candidates: names,
        }),
    }
}

fn print_or_fail(output: Result<String>) -> i32 {
    match output {
        Ok(output) => {
            if output.ends_with('\n') {
                print!("{}", output);
            } else {
                println!("{}", output);
            }
            EXIT_SUCCESS
        }
        Err(e) => report_error(HandlerError::Failed(e)),
    }
}

fn report_error(error: HandlerError) -> i32 {
    match &error {
        HandlerError::Failed(e) => eprintln!("Error: {:#}", e),
        other => eprintln!("Error: {}", other),
    }
    error.exit_code()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StubResolver {
        head: Option<String>,
        checkouts: Mutex<Vec<String>>,
        fail_checkout: bool,
    }

    impl StubResolver {
        fn at(head: Option<&str>) -> Self {
            Self {
                head: head.map(str::to_string),
                checkouts: Mutex::new(Vec::new()),
                fail_checkout: false,
            }
        }
    }

    #[async_trait]
    impl CommitResolver for StubResolver {
        async fn current_commit(&self, _repo: &Path) -> Result<Option<String>> {
            Ok(self.head.clone())
        }

        async fn checkout(&self, _repo: &Path, revision: &str) -> Result<()> {
            if self.fail_checkout {
                return Err(anyhow!("pathspec '{}' did not match", revision));
            }
            self.checkouts.lock().unwrap().push(revision.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_resolve_commit_uses_head() {
        let resolver = StubResolver::at(Some("abcdef0123"));
        let commit = resolve_commit(&resolver, Path::new("/repo"), None)
            .await
            .unwrap();
        assert_eq!(commit.as_deref(), Some("abcdef0123"));
        assert!(resolver.checkouts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_resolve_commit_checks_out_revision() {
        let resolver = StubResolver::at(Some("fedcba9876"));
        let commit = resolve_commit(&resolver, Path::new("/repo"), Some("v1.0"))
            .await
            .unwrap();
        assert_eq!(commit.as_deref(), Some("fedcba9876"));
        assert_eq!(*resolver.checkouts.lock().unwrap(), vec!["v1.0"]);
    }

    #[tokio::test]
    async fn test_resolve_commit_checkout_failure() {
        let mut resolver = StubResolver::at(None);
        resolver.fail_checkout = true;
        let err = resolve_commit(&resolver, Path::new("/repo"), Some("nope"))
            .await
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to check out 'nope'"));
    }

    #[test]
    fn test_select_single_workflow() {
        let fs = MockFileSystem::new();
        fs.add_file("app/.github/workflows/ci.yml", "jobs: {}");

        let workflow = select_workflow(&fs, Path::new("/mock/app"), None).unwrap();
        assert_eq!(workflow, PathBuf::from("/mock/app/.github/workflows/ci.yml"));
    }

    #[test]
    fn test_select_workflow_ambiguous() {
        let fs = MockFileSystem::new();
        fs.add_file("app/.github/workflows/ci.yml", "jobs: {}");
        fs.add_file("app/.github/workflows/release.yml", "jobs: {}");

        let err = select_workflow(&fs, Path::new("/mock/app"), None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        let message = err.to_string();
        assert!(message.contains("--workflow"));
        assert!(message.contains(".github/workflows/ci.yml"));
        assert!(message.contains(".github/workflows/release.yml"));
    }

    #[test]
    fn test_select_workflow_none_found() {
        let fs = MockFileSystem::new();
        fs.add_dir("app");

        let err = select_workflow(&fs, Path::new("/mock/app"), None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_FAILURE);
    }

    #[test]
    fn test_select_explicit_workflow_relative_to_project() {
        let fs = MockFileSystem::new();
        fs.add_file("app/ci/pipeline.yml", "jobs: {}");

        let workflow =
            select_workflow(&fs, Path::new("/mock/app"), Some(Path::new("ci/pipeline.yml")))
                .unwrap();
        assert_eq!(workflow, PathBuf::from("/mock/app/ci/pipeline.yml"));

        let err = select_workflow(&fs, Path::new("/mock/app"), Some(Path::new("missing.yml")))
            .unwrap_err();
        assert!(err.to_string().contains("missing.yml"));
    }

    #[test]
    fn test_select_job() {
        let extractor = BuildSpecExtractor::default();

        let single = WorkflowDocument::parse("jobs:\n  build:\n    steps: []\n").unwrap();
        assert_eq!(select_job(&extractor, &single, None).unwrap(), "build");

        let multiple =
            WorkflowDocument::parse("jobs:\n  build: {}\n  test: {}\n").unwrap();
        let err = select_job(&extractor, &multiple, None).unwrap_err();
        assert_eq!(err.exit_code(), EXIT_USAGE);
        assert!(err.to_string().contains("  - build\n  - test"));

        assert_eq!(
            select_job(&extractor, &multiple, Some("test")).unwrap(),
            "test"
        );

        let empty = WorkflowDocument::parse("jobs: {}\n").unwrap();
        assert_eq!(
            select_job(&extractor, &empty, None).unwrap_err().exit_code(),
            EXIT_FAILURE
        );
    }
}
