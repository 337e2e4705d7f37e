use super::error::{ArtifactKind, BuildStage, PipelineError};
use super::state::PipelineState;
use crate::config::{ReproConfig, DEFAULT_RECIPE_EXTENSION};
use crate::executor::{BuildExecutor, ContainerCli, ExecutionOutput};
use crate::fs::FileSystem;
use crate::progress::{ProgressEvent, ProgressHandler};
use crate::project::ProjectContext;
use crate::recipe::{ArtifactSynthesizer, GeneratedArtifacts, IGNORE_FILE_NAME};
use crate::workflow::{BuildSpec, BuildSpecExtractor, WorkflowDocument};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

const STAGING_SUFFIX: &str = ".reprobox-tmp";
const BACKUP_SUFFIX: &str = ".reprobox-bak";

/// Everything needed for one end-to-end run
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    pub document: WorkflowDocument,
    pub job: String,
    pub project: ProjectContext,
    /// Directory receiving the recipe file
    pub output_dir: PathBuf,
    pub build: bool,
    /// Run the image after building; implies `build`
    pub run: bool,
}

/// Files committed by [`PipelineOrchestrator::write_artifacts`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenArtifacts {
    pub recipe_path: PathBuf,
    pub ignore_path: PathBuf,
    pub image_tag: String,
    pub artifacts: GeneratedArtifacts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub image_tag: String,
    pub build: ExecutionOutput,
    pub run: Option<ExecutionOutput>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutcome {
    pub state: PipelineState,
    pub spec: BuildSpec,
    pub written: WrittenArtifacts,
    pub build: Option<BuildReport>,
}

/// Sequences extraction, synthesis and the optional container build.
///
/// Each operation is only valid from one state; calling it from any other
/// state yields [`PipelineError::InvalidTransition`]. Any failure moves the
/// run to [`PipelineState::Failed`].
pub struct PipelineOrchestrator {
    fs: Arc<dyn FileSystem>,
    extractor: BuildSpecExtractor,
    synthesizer: ArtifactSynthesizer,
    executor: Option<Arc<dyn BuildExecutor>>,
    progress_handler: Option<Arc<dyn ProgressHandler>>,
    recipe_extension: String,
    state: PipelineState,
    selected_job: Option<String>,
}

impl PipelineOrchestrator {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            extractor: BuildSpecExtractor::default(),
            synthesizer: ArtifactSynthesizer::default(),
            executor: None,
            progress_handler: None,
            recipe_extension: DEFAULT_RECIPE_EXTENSION.to_string(),
            state: PipelineState::Idle,
            selected_job: None,
        }
    }

    /// Orchestrator wired from configuration, using the configured container CLI
    pub fn from_config(fs: Arc<dyn FileSystem>, config: &ReproConfig) -> Self {
        Self::new(fs)
            .with_extractor(BuildSpecExtractor::new(config.fallback_runtime.clone()))
            .with_synthesizer(ArtifactSynthesizer::from_config(config))
            .with_executor(Arc::new(ContainerCli::new(config.container_binary.clone())))
            .with_recipe_extension(config.recipe_extension.clone())
    }

    pub fn with_extractor(mut self, extractor: BuildSpecExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn with_synthesizer(mut self, synthesizer: ArtifactSynthesizer) -> Self {
        self.synthesizer = synthesizer;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn BuildExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    pub fn with_progress_handler(mut self, handler: Arc<dyn ProgressHandler>) -> Self {
        self.progress_handler = Some(handler);
        self
    }

    pub fn with_recipe_extension(mut self, extension: impl Into<String>) -> Self {
        self.recipe_extension = extension.into();
        self
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn selected_job(&self) -> Option<&str> {
        self.selected_job.as_deref()
    }

    pub fn select_job(&mut self, name: &str) -> Result<(), PipelineError> {
        self.expect_state(PipelineState::Idle, "select a job")?;
        debug!(job = name, "Job selected");
        self.selected_job = Some(name.to_string());
        self.state = PipelineState::JobSelected;
        Ok(())
    }

    pub fn build_spec(&mut self, document: &WorkflowDocument) -> Result<BuildSpec, PipelineError> {
        self.expect_state(PipelineState::JobSelected, "build a spec")?;
        let start = self.stage_started(PipelineState::SpecBuilt);

        let job_name = self.selected_job.clone().unwrap_or_default();
        let spec = self
            .extractor
            .extract_jobs(document)
            .and_then(|table| table.require(&job_name).map(|job| self.extractor.build_spec(job)));

        match spec {
            Ok(spec) => {
                info!(
                    job = %spec.job_name,
                    runtime_version = %spec.runtime_version,
                    commands = spec.commands.len(),
                    "Extracted build spec"
                );
                if spec.is_empty() {
                    warn!(job = %spec.job_name, "Job has no run steps");
                }
                self.advance(PipelineState::SpecBuilt, start);
                Ok(spec)
            }
            Err(e) => Err(self.fail(PipelineState::SpecBuilt, e.into())),
        }
    }

    /// Write the recipe into `output_dir` and the exclusion file into the
    /// project root.
    ///
    /// Both files are staged next to their destination and renamed into place.
    /// If anything fails, staged files are removed and a recipe that was
    /// already moved into place is restored to its previous state.
    pub fn write_artifacts(
        &mut self,
        spec: &BuildSpec,
        project: &ProjectContext,
        output_dir: &Path,
    ) -> Result<WrittenArtifacts, PipelineError> {
        self.expect_state(PipelineState::SpecBuilt, "write artifacts")?;
        let start = self.stage_started(PipelineState::ArtifactsWritten);

        match self.commit_artifacts(spec, project, output_dir) {
            Ok(written) => {
                for path in [&written.recipe_path, &written.ignore_path] {
                    self.emit(ProgressEvent::ArtifactWritten {
                        path: path.display().to_string(),
                    });
                }
                self.advance(PipelineState::ArtifactsWritten, start);
                Ok(written)
            }
            Err(e) => Err(self.fail(PipelineState::ArtifactsWritten, e)),
        }
    }

    /// Build the image from written artifacts and optionally run it.
    ///
    /// A non-zero build exit status fails the run without invoking the run step.
    pub async fn request_build(
        &mut self,
        written: &WrittenArtifacts,
        project: &ProjectContext,
        run: bool,
    ) -> Result<BuildReport, PipelineError> {
        self.expect_state(PipelineState::ArtifactsWritten, "request a build")?;
        let start = self.stage_started(PipelineState::BuildRequested);
        self.state = PipelineState::BuildRequested;

        let executor = match &self.executor {
            Some(executor) => executor.clone(),
            None => {
                let err = PipelineError::Executor {
                    stage: BuildStage::Build,
                    reason: "no build executor configured".to_string(),
                };
                return Err(self.fail(PipelineState::BuildRequested, err));
            }
        };

        let description =
            executor.describe_build(&written.recipe_path, &project.root, &written.image_tag);
        let build = executor.build(&written.recipe_path, &project.root, &written.image_tag);
        let build = match self.await_command(BuildStage::Build, description, build).await {
            Ok(output) => output,
            Err(e) => return Err(self.fail(PipelineState::BuildRequested, e)),
        };

        let run_output = if run {
            let description = executor.describe_run(&written.image_tag);
            let run = executor.run(&written.image_tag);
            match self.await_command(BuildStage::Run, description, run).await {
                Ok(output) => Some(output),
                Err(e) => return Err(self.fail(PipelineState::BuildRequested, e)),
            }
        } else {
            None
        };

        self.advance(PipelineState::BuildComplete, start);
        Ok(BuildReport {
            image_tag: written.image_tag.clone(),
            build,
            run: run_output,
        })
    }

    /// Drive a fresh run from job selection to the requested final state
    pub async fn execute(
        &mut self,
        request: PipelineRequest,
    ) -> Result<PipelineOutcome, PipelineError> {
        let start = Instant::now();
        info!(
            project = %request.project.name,
            job = %request.job,
            "Starting pipeline"
        );
        self.emit(ProgressEvent::Started {
            project: request.project.name.clone(),
            job: request.job.clone(),
        });

        self.select_job(&request.job)?;
        let spec = self.build_spec(&request.document)?;
        let written = self.write_artifacts(&spec, &request.project, &request.output_dir)?;

        let build = if request.build || request.run {
            Some(
                self.request_build(&written, &request.project, request.run)
                    .await?,
            )
        } else {
            None
        };

        info!(state = %self.state, "Pipeline complete");
        self.emit(ProgressEvent::Completed {
            state: self.state.to_string(),
            total_time: start.elapsed(),
        });

        Ok(PipelineOutcome {
            state: self.state,
            spec,
            written,
            build,
        })
    }

    fn commit_artifacts(
        &self,
        spec: &BuildSpec,
        project: &ProjectContext,
        output_dir: &Path,
    ) -> Result<WrittenArtifacts, PipelineError> {
        let file_name = project.recipe_file_name(&self.recipe_extension);
        let recipe_path = output_dir.join(&file_name);
        let ignore_path = project.root.join(IGNORE_FILE_NAME);
        check_recipe_target(&file_name, &recipe_path, &ignore_path)?;
        if self.fs.is_dir(&recipe_path) {
            return Err(PipelineError::ArtifactWrite {
                artifact: ArtifactKind::Recipe,
                path: recipe_path,
                reason: "a directory exists at this path".to_string(),
            });
        }

        let existing_ignore = if self.fs.is_file(&ignore_path) {
            let content = self.fs.read_to_string(&ignore_path).map_err(|e| {
                write_error(ArtifactKind::IgnoreFile, &ignore_path, &e)
            })?;
            Some(content)
        } else {
            None
        };
        let artifacts = self
            .synthesizer
            .synthesize(spec, project, existing_ignore.as_deref());

        self.fs
            .create_dir_all(output_dir)
            .map_err(|e| write_error(ArtifactKind::Recipe, &recipe_path, &e))?;

        let staged_recipe = sibling_path(&recipe_path, STAGING_SUFFIX);
        let staged_ignore = sibling_path(&ignore_path, STAGING_SUFFIX);

        if let Err(e) = self.fs.write(&staged_recipe, &artifacts.recipe_text) {
            self.discard(&[&staged_recipe]);
            return Err(write_error(ArtifactKind::Recipe, &recipe_path, &e));
        }
        if let Err(e) = self.fs.write(&staged_ignore, &artifacts.ignore_text()) {
            self.discard(&[&staged_recipe, &staged_ignore]);
            return Err(write_error(ArtifactKind::IgnoreFile, &ignore_path, &e));
        }

        // An existing recipe is moved aside untouched so rollback restores its exact bytes
        let backup = if self.fs.exists(&recipe_path) {
            let backup = sibling_path(&recipe_path, BACKUP_SUFFIX);
            if let Err(e) = self.fs.rename(&recipe_path, &backup) {
                self.discard(&[&staged_recipe, &staged_ignore]);
                return Err(write_error(ArtifactKind::Recipe, &recipe_path, &e));
            }
            Some(backup)
        } else {
            None
        };

        if let Err(e) = self.fs.rename(&staged_recipe, &recipe_path) {
            self.discard(&[&staged_recipe, &staged_ignore]);
            self.restore(&recipe_path, backup.as_deref());
            return Err(write_error(ArtifactKind::Recipe, &recipe_path, &e));
        }
        if let Err(e) = self.fs.rename(&staged_ignore, &ignore_path) {
            self.discard(&[&staged_ignore]);
            self.restore(&recipe_path, backup.as_deref());
            return Err(write_error(ArtifactKind::IgnoreFile, &ignore_path, &e));
        }

        if let Some(backup) = &backup {
            self.discard(&[backup]);
        }

        debug!(
            recipe = %recipe_path.display(),
            ignore = %ignore_path.display(),
            "Artifacts committed"
        );
        Ok(WrittenArtifacts {
            recipe_path,
            ignore_path,
            image_tag: project.image_tag(&self.recipe_extension),
            artifacts,
        })
    }

    async fn await_command<F>(
        &self,
        stage: BuildStage,
        description: String,
        command: F,
    ) -> Result<ExecutionOutput, PipelineError>
    where
        F: std::future::Future<Output = anyhow::Result<ExecutionOutput>>,
    {
        self.emit(ProgressEvent::CommandStarted {
            command: description.clone(),
        });
        let start = Instant::now();

        let output = command.await.map_err(|e| PipelineError::Executor {
            stage,
            reason: format!("{:#}", e),
        })?;

        self.emit(ProgressEvent::CommandFinished {
            command: description,
            exit_code: output.exit_code,
            duration: start.elapsed(),
        });

        if output.success() {
            Ok(output)
        } else {
            Err(PipelineError::BuildFailed {
                stage,
                exit_code: output.exit_code,
                output: output.combined(),
            })
        }
    }

    fn discard(&self, paths: &[&PathBuf]) {
        for path in paths {
            if self.fs.exists(path) {
                if let Err(e) = self.fs.remove_file(path) {
                    warn!(path = %path.display(), error = %e, "Could not remove temporary file");
                }
            }
        }
    }

    /// Put the recipe back as it was: the backup is moved back into place, and
    /// without a backup the path was empty before the run, so the new file goes.
    fn restore(&self, path: &Path, backup: Option<&Path>) {
        let result = match backup {
            Some(backup) => self.fs.rename(backup, path),
            None if self.fs.is_file(path) => self.fs.remove_file(path),
            None => Ok(()),
        };
        match result {
            Ok(()) => debug!(path = %path.display(), "Rolled back recipe file"),
            Err(e) => warn!(path = %path.display(), error = %e, "Could not roll back recipe file"),
        }
    }

    fn expect_state(
        &self,
        expected: PipelineState,
        operation: &'static str,
    ) -> Result<(), PipelineError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(PipelineError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn stage_started(&self, stage: PipelineState) -> Instant {
        self.emit(ProgressEvent::StageStarted {
            stage: stage.to_string(),
        });
        Instant::now()
    }

    fn advance(&mut self, next: PipelineState, started: Instant) {
        self.state = next;
        self.emit(ProgressEvent::StageComplete {
            stage: next.to_string(),
            duration: started.elapsed(),
        });
    }

    fn fail(&mut self, stage: PipelineState, error: PipelineError) -> PipelineError {
        self.state = PipelineState::Failed;
        self.emit(ProgressEvent::Failed {
            stage: stage.to_string(),
            error: error.to_string(),
        });
        error
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(handler) = &self.progress_handler {
            handler.on_progress(&event);
        }
    }
}

/// Hidden file next to `path`, e.g. `out/.webapp.Dockerfile.reprobox-tmp`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}{}", name.trim_start_matches('.'), suffix))
}

/// The recipe name must be a plain file name and must not collide with the
/// exclusion file.
fn check_recipe_target(
    file_name: &str,
    recipe_path: &Path,
    ignore_path: &Path,
) -> Result<(), PipelineError> {
    let reason = if file_name.contains('/') || file_name.contains('\\') {
        Some("output name must be a file name without path separators")
    } else if file_name.is_empty() || file_name == "." || file_name == ".." {
        Some("output name is not a valid file name")
    } else if file_name == IGNORE_FILE_NAME || recipe_path == ignore_path {
        Some("output name collides with the exclusion file")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(PipelineError::ArtifactWrite {
            artifact: ArtifactKind::Recipe,
            path: recipe_path.to_path_buf(),
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

fn write_error(artifact: ArtifactKind, path: &Path, error: &anyhow::Error) -> PipelineError {
    PipelineError::ArtifactWrite {
        artifact,
        path: path.to_path_buf(),
        reason: format!("{:#}", error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MockFileSystem;
    use crate::progress::LoggingHandler;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::Mutex;

    const WORKFLOW: &str = r#"
jobs:
  build:
    steps:
      - uses: actions/checkout@v4
      - uses: actions/setup-node@v4
        with:
          node-version: 18
      - run: npm ci
      - run: npm test
  lint:
    steps:
      - run: npm run lint
"#;

    #[derive(Default)]
    struct RecordingExecutor {
        build_exit: Option<i32>,
        calls: Mutex<Vec<String>>,
    }

    impl RecordingExecutor {
        fn exiting(code: i32) -> Self {
            Self {
                build_exit: Some(code),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BuildExecutor for RecordingExecutor {
        async fn build(
            &self,
            _recipe: &Path,
            _context_dir: &Path,
            tag: &str,
        ) -> Result<ExecutionOutput> {
            self.calls.lock().unwrap().push(format!("build {}", tag));
            Ok(ExecutionOutput {
                exit_code: self.build_exit,
                stdout: "building\n".to_string(),
                stderr: String::new(),
            })
        }

        async fn run(&self, image: &str) -> Result<ExecutionOutput> {
            self.calls.lock().unwrap().push(format!("run {}", image));
            Ok(ExecutionOutput {
                exit_code: Some(0),
                stdout: "ok\n".to_string(),
                stderr: String::new(),
            })
        }

        fn describe_build(&self, _recipe: &Path, _context_dir: &Path, tag: &str) -> String {
            format!("mock build {}", tag)
        }

        fn describe_run(&self, image: &str) -> String {
            format!("mock run {}", image)
        }
    }

    fn setup() -> (Arc<MockFileSystem>, ProjectContext) {
        let fs = Arc::new(MockFileSystem::new());
        fs.add_file("webapp/package.json", "{}");
        let project = ProjectContext::new("/mock/webapp", "webapp");
        (fs, project)
    }

    fn request(project: ProjectContext, job: &str) -> PipelineRequest {
        PipelineRequest {
            document: WorkflowDocument::parse(WORKFLOW).unwrap(),
            job: job.to_string(),
            project,
            output_dir: PathBuf::from("/mock/out"),
            build: false,
            run: false,
        }
    }

    #[tokio::test]
    async fn test_orchestrator_creation() {
        let (fs, _) = setup();
        let orchestrator = PipelineOrchestrator::new(fs);
        assert!(orchestrator.progress_handler.is_none());
        assert!(orchestrator.executor.is_none());
        assert_eq!(orchestrator.state(), PipelineState::Idle);
    }

    #[tokio::test]
    async fn test_orchestrator_with_progress() {
        let (fs, _) = setup();
        let orchestrator =
            PipelineOrchestrator::new(fs).with_progress_handler(Arc::new(LoggingHandler));
        assert!(orchestrator.progress_handler.is_some());
    }

    #[tokio::test]
    async fn test_execute_without_build_stops_after_artifacts() {
        let (fs, project) = setup();
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let outcome = orchestrator.execute(request(project, "build")).await.unwrap();

        assert_eq!(outcome.state, PipelineState::ArtifactsWritten);
        assert_eq!(outcome.spec.commands, vec!["npm ci", "npm test"]);
        assert!(outcome.build.is_none());
        assert_eq!(
            outcome.written.recipe_path,
            PathBuf::from("/mock/out/webapp.Dockerfile")
        );

        let recipe = fs.read_to_string(&outcome.written.recipe_path).unwrap();
        assert!(recipe.contains("FROM node:18-alpine"));
        assert!(recipe.contains("RUN npm ci\nRUN npm test\n"));

        let ignore = fs
            .read_to_string(Path::new("/mock/webapp/.dockerignore"))
            .unwrap();
        assert_eq!(ignore, "node_modules/\n.git/\nnpm-debug.log\n");
    }

    #[tokio::test]
    async fn test_execute_with_build_and_run() {
        let (fs, project) = setup();
        let executor = Arc::new(RecordingExecutor::exiting(0));
        let mut orchestrator =
            PipelineOrchestrator::new(fs).with_executor(executor.clone());

        let mut req = request(project.with_commit(Some("abcdef0123".to_string())), "build");
        req.run = true;
        let outcome = orchestrator.execute(req).await.unwrap();

        assert_eq!(outcome.state, PipelineState::BuildComplete);
        assert_eq!(
            executor.calls(),
            vec!["build webapp_abcdef0", "run webapp_abcdef0"]
        );
        let report = outcome.build.unwrap();
        assert_eq!(report.image_tag, "webapp_abcdef0");
        assert!(report.run.is_some());
    }

    #[tokio::test]
    async fn test_failed_build_skips_run() {
        let (fs, project) = setup();
        let executor = Arc::new(RecordingExecutor::exiting(1));
        let mut orchestrator =
            PipelineOrchestrator::new(fs).with_executor(executor.clone());

        let mut req = request(project, "build");
        req.run = true;
        let err = orchestrator.execute(req).await.unwrap_err();

        match err {
            PipelineError::BuildFailed {
                stage,
                exit_code,
                output,
            } => {
                assert_eq!(stage, BuildStage::Build);
                assert_eq!(exit_code, Some(1));
                assert_eq!(output, "building");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(executor.calls(), vec!["build webapp"]);
        assert_eq!(orchestrator.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_build_without_executor_fails() {
        let (fs, project) = setup();
        let mut orchestrator = PipelineOrchestrator::new(fs);

        let mut req = request(project, "build");
        req.build = true;
        let err = orchestrator.execute(req).await.unwrap_err();

        assert!(matches!(err, PipelineError::Executor { .. }));
        assert_eq!(orchestrator.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_unknown_job_fails() {
        let (fs, project) = setup();
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let err = orchestrator
            .execute(request(project, "deploy"))
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::MalformedDocument(_)));
        assert!(err.to_string().contains("build, lint"));
        assert_eq!(orchestrator.state(), PipelineState::Failed);
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[test]
    fn test_out_of_order_operations() {
        let (fs, project) = setup();
        let mut orchestrator = PipelineOrchestrator::new(fs);
        let document = WorkflowDocument::parse(WORKFLOW).unwrap();

        let err = orchestrator.build_spec(&document).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidTransition {
                state: PipelineState::Idle,
                ..
            }
        ));

        orchestrator.select_job("lint").unwrap();
        assert!(orchestrator.select_job("build").is_err());
        assert_eq!(orchestrator.selected_job(), Some("lint"));

        let spec = BuildSpec {
            job_name: "lint".to_string(),
            runtime_version: "lts".to_string(),
            version_declared: false,
            commands: vec![],
        };
        let err = orchestrator
            .write_artifacts(&spec, &project, Path::new("/mock/out"))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(orchestrator.state(), PipelineState::JobSelected);
    }

    #[tokio::test]
    async fn test_request_build_before_artifacts_is_rejected() {
        let (fs, project) = setup();
        let mut orchestrator = PipelineOrchestrator::new(fs)
            .with_executor(Arc::new(RecordingExecutor::default()));
        let written = WrittenArtifacts {
            recipe_path: PathBuf::from("/mock/out/webapp.Dockerfile"),
            ignore_path: PathBuf::from("/mock/webapp/.dockerignore"),
            image_tag: "webapp".to_string(),
            artifacts: GeneratedArtifacts {
                recipe_text: String::new(),
                ignore_entries: vec![],
            },
        };

        let err = orchestrator
            .request_build(&written, &project, false)
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_existing_ignore_entries_are_merged() {
        let (fs, project) = setup();
        fs.add_file("webapp/.dockerignore", "dist/\n\n.git/\n");
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        orchestrator.execute(request(project, "lint")).await.unwrap();

        let ignore = fs
            .read_to_string(Path::new("/mock/webapp/.dockerignore"))
            .unwrap();
        assert_eq!(ignore, "dist/\n.git/\nnode_modules/\nnpm-debug.log\n");
    }

    #[tokio::test]
    async fn test_failed_ignore_write_rolls_back_new_recipe() {
        let (fs, project) = setup();
        fs.deny_writes("webapp/.dockerignore");
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let err = orchestrator
            .execute(request(project, "build"))
            .await
            .unwrap_err();

        match &err {
            PipelineError::ArtifactWrite { artifact, path, .. } => {
                assert_eq!(*artifact, ArtifactKind::IgnoreFile);
                assert_eq!(path, &PathBuf::from("/mock/webapp/.dockerignore"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(orchestrator.state(), PipelineState::Failed);
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[tokio::test]
    async fn test_failed_ignore_write_restores_previous_recipe() {
        let (fs, project) = setup();
        fs.add_file("out/webapp.Dockerfile", "FROM scratch\n");
        fs.deny_writes("webapp/.dockerignore");
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        assert!(orchestrator.execute(request(project, "build")).await.is_err());

        assert_eq!(
            fs.read_to_string(Path::new("/mock/out/webapp.Dockerfile"))
                .unwrap(),
            "FROM scratch\n"
        );
        assert_eq!(
            fs.file_paths(),
            vec![
                PathBuf::from("/mock/out/webapp.Dockerfile"),
                PathBuf::from("/mock/webapp/package.json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_recipe_write_leaves_nothing() {
        let (fs, project) = setup();
        fs.add_dir("out");
        fs.deny_writes("out/.webapp.Dockerfile.reprobox-tmp");
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let err = orchestrator
            .execute(request(project, "build"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ArtifactWrite {
                artifact: ArtifactKind::Recipe,
                ..
            }
        ));
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[test]
    fn test_sibling_path() {
        assert_eq!(
            sibling_path(Path::new("/repo/.dockerignore"), STAGING_SUFFIX),
            PathBuf::from("/repo/.dockerignore.reprobox-tmp")
        );
        assert_eq!(
            sibling_path(Path::new("/out/webapp.Dockerfile"), BACKUP_SUFFIX),
            PathBuf::from("/out/.webapp.Dockerfile.reprobox-bak")
        );
    }

    #[tokio::test]
    async fn test_output_name_matching_ignore_file_is_rejected() {
        let (fs, project) = setup();
        let project = project.with_output_name(Some(".dockerignore".to_string()));
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());
        let mut request = request(project, "build");
        request.output_dir = PathBuf::from("/mock/webapp");

        let err = orchestrator.execute(request).await.unwrap_err();

        match &err {
            PipelineError::ArtifactWrite {
                artifact, reason, ..
            } => {
                assert_eq!(*artifact, ArtifactKind::Recipe);
                assert!(reason.contains("exclusion file"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(orchestrator.state(), PipelineState::Failed);
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[tokio::test]
    async fn test_output_name_with_path_separator_is_rejected() {
        let (fs, project) = setup();
        let project = project.with_output_name(Some("sub/x.Dockerfile".to_string()));
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let err = orchestrator
            .execute(request(project, "build"))
            .await
            .unwrap_err();

        match &err {
            PipelineError::ArtifactWrite {
                artifact, reason, ..
            } => {
                assert_eq!(*artifact, ArtifactKind::Recipe);
                assert!(reason.contains("path separators"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[tokio::test]
    async fn test_directory_at_recipe_path_is_rejected() {
        let (fs, project) = setup();
        fs.add_dir("out/webapp.Dockerfile");
        let mut orchestrator = PipelineOrchestrator::new(fs.clone());

        let err = orchestrator
            .execute(request(project, "build"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ArtifactWrite {
                artifact: ArtifactKind::Recipe,
                ..
            }
        ));
        assert!(fs.is_dir(Path::new("/mock/out/webapp.Dockerfile")));
        assert_eq!(fs.file_paths(), vec![PathBuf::from("/mock/webapp/package.json")]);
    }

    #[tokio::test]
    async fn test_identical_runs_produce_identical_artifacts() {
        let (fs, project) = setup();

        let mut first = PipelineOrchestrator::new(fs.clone());
        let a = first.execute(request(project.clone(), "build")).await.unwrap();
        let mut second = PipelineOrchestrator::new(fs.clone());
        let b = second.execute(request(project, "build")).await.unwrap();

        assert_eq!(a.written, b.written);
    }
}
