//! Output formatting for multiple formats
//!
//! Generation results, job listings and the configuration can be rendered as
//! JSON, YAML or human-readable text. The `dockerfile` format prints the
//! generated recipe verbatim and only applies to generation results.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::ReproConfig;
use crate::executor::ExecutionOutput;
use crate::pipeline::{BuildReport, PipelineOutcome, PipelineState};
use crate::project::ProjectContext;
use crate::workflow::{BuildSpec, BuildSpecExtractor, JobTable};

const RULE: &str = "\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}\u{2501}";

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// YAML format (human-friendly, version-control friendly)
    Yaml,
    /// Human-readable formatted text
    Human,
    /// The generated recipe file itself
    Dockerfile,
}

/// Result of a `generate` run as shown to the user
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub project: String,
    pub project_root: PathBuf,
    pub workflow: PathBuf,
    pub commit: Option<String>,
    pub state: PipelineState,
    pub spec: BuildSpec,
    pub recipe_path: PathBuf,
    pub ignore_path: PathBuf,
    pub image_tag: String,
    pub recipe: String,
    pub ignore_entries: Vec<String>,
    pub build: Option<BuildReport>,
}

impl GenerationReport {
    pub fn new(project: &ProjectContext, workflow: &Path, outcome: PipelineOutcome) -> Self {
        let PipelineOutcome {
            state,
            spec,
            written,
            build,
        } = outcome;

        Self {
            project: project.name.clone(),
            project_root: project.root.clone(),
            workflow: workflow.to_path_buf(),
            commit: project.commit.clone(),
            state,
            spec,
            recipe_path: written.recipe_path,
            ignore_path: written.ignore_path,
            image_tag: written.image_tag,
            recipe: written.artifacts.recipe_text,
            ignore_entries: written.artifacts.ignore_entries,
            build,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub name: String,
    pub runtime_version: String,
    pub version_declared: bool,
    pub steps: usize,
    pub commands: Vec<String>,
}

/// Jobs of one workflow file
#[derive(Debug, Clone, Serialize)]
pub struct JobListing {
    pub workflow: PathBuf,
    pub jobs: Vec<JobSummary>,
}

impl JobListing {
    pub fn new(workflow: &Path, table: &JobTable, extractor: &BuildSpecExtractor) -> Self {
        let jobs = table
            .iter()
            .map(|job| {
                let spec = extractor.build_spec(job);
                JobSummary {
                    name: job.name.clone(),
                    runtime_version: spec.runtime_version,
                    version_declared: spec.version_declared,
                    steps: job.steps.len(),
                    commands: spec.commands,
                }
            })
            .collect();

        Self {
            workflow: workflow.to_path_buf(),
            jobs,
        }
    }
}

pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_generation(&self, report: &GenerationReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report)
                .context("Failed to serialize generation report to JSON"),
            OutputFormat::Yaml => serde_yaml::to_string(report)
                .context("Failed to serialize generation report to YAML"),
            OutputFormat::Human => Ok(self.format_generation_human(report)),
            OutputFormat::Dockerfile => Ok(report.recipe.clone()),
        }
    }

    pub fn format_jobs(&self, listing: &JobListing) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(listing).context("Failed to serialize jobs to JSON")
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(listing).context("Failed to serialize jobs to YAML")
            }
            OutputFormat::Human => Ok(self.format_jobs_human(listing)),
            OutputFormat::Dockerfile => {
                bail!("The dockerfile format is only available for the generate command")
            }
        }
    }

    pub fn format_config(&self, config: &ReproConfig) -> Result<String> {
        let config_map: std::collections::BTreeMap<_, _> =
            config.to_display_map().into_iter().collect();
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(&config_map)
                .context("Failed to serialize config to JSON"),
            OutputFormat::Yaml => {
                serde_yaml::to_string(&config_map).context("Failed to serialize config to YAML")
            }
            OutputFormat::Human => Ok(config.to_string()),
            OutputFormat::Dockerfile => {
                bail!("The dockerfile format is only available for the generate command")
            }
        }
    }

    fn format_generation_human(&self, report: &GenerationReport) -> String {
        let mut output = String::new();

        output.push_str(&format!(
            "\u{2713} Reproduced job '{}' of {}\n",
            report.spec.job_name, report.project
        ));
        output.push_str(RULE);
        output.push_str("\n\n");

        output.push_str(&format!("Workflow:  {}\n", report.workflow.display()));
        match &report.commit {
            Some(commit) => output.push_str(&format!("Commit:    {}\n", commit)),
            None => output.push_str("Commit:    (not a git checkout)\n"),
        }
        let version_note = if report.spec.version_declared {
            ""
        } else {
            " (fallback)"
        };
        output.push_str(&format!(
            "Runtime:   {}{}\n\n",
            report.spec.runtime_version, version_note
        ));

        output.push_str("Commands:\n");
        if report.spec.commands.is_empty() {
            output.push_str("\u{2514}\u{2500} (no run steps)\n");
        }
        for (i, command) in report.spec.commands.iter().enumerate() {
            let connector = if i == report.spec.commands.len() - 1 {
                "\u{2514}"
            } else {
                "\u{251C}"
            };
            let first_line = command.lines().next().unwrap_or_default();
            output.push_str(&format!("{}\u{2500} {}\n", connector, first_line));
        }
        output.push('\n');

        output.push_str("Artifacts:\n");
        output.push_str(&format!(
            "\u{251C}\u{2500} Recipe:  {}\n",
            report.recipe_path.display()
        ));
        output.push_str(&format!(
            "\u{251C}\u{2500} Ignore:  {} ({} entries)\n",
            report.ignore_path.display(),
            report.ignore_entries.len()
        ));
        output.push_str(&format!("\u{2514}\u{2500} Image:   {}\n", report.image_tag));

        if let Some(build) = &report.build {
            output.push('\n');
            output.push_str(&format_execution("Build", &build.build));
            if let Some(run) = &build.run {
                output.push_str(&format_execution("Run", run));
            }
        }

        output.push_str(&format!("\nFinal state: {}\n", report.state));
        output
    }

    fn format_jobs_human(&self, listing: &JobListing) -> String {
        let mut output = String::new();

        output.push_str(&format!("Jobs in {}\n", listing.workflow.display()));
        output.push_str(RULE);
        output.push_str("\n\n");

        if listing.jobs.is_empty() {
            output.push_str("(no jobs)\n");
            return output;
        }

        let width = listing
            .jobs
            .iter()
            .map(|j| j.name.len())
            .max()
            .unwrap_or(0);
        for job in &listing.jobs {
            let version = if job.version_declared {
                job.runtime_version.clone()
            } else {
                format!("{} (fallback)", job.runtime_version)
            };
            output.push_str(&format!(
                "{:<width$}  runtime {}, {} step(s), {} command(s)\n",
                job.name,
                version,
                job.steps,
                job.commands.len(),
                width = width
            ));
        }

        output
    }
}

fn format_execution(label: &str, execution: &ExecutionOutput) -> String {
    let status = match execution.exit_code {
        Some(0) => "\u{2713} succeeded".to_string(),
        Some(code) => format!("\u{2717} exited with {}", code),
        None => "\u{2717} terminated by signal".to_string(),
    };
    let mut output = format!("{}: {}\n", label, status);
    let combined = execution.combined();
    if !combined.is_empty() {
        for line in combined.lines() {
            output.push_str(&format!("  {}\n", line));
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::WrittenArtifacts;
    use crate::recipe::GeneratedArtifacts;
    use crate::workflow::WorkflowDocument;

    fn create_test_report() -> GenerationReport {
        let project = ProjectContext::new("/src/webapp", "webapp")
            .with_commit(Some("0123456789abcdef".to_string()));
        let outcome = PipelineOutcome {
            state: PipelineState::ArtifactsWritten,
            spec: BuildSpec {
                job_name: "build".to_string(),
                runtime_version: "18".to_string(),
                version_declared: true,
                commands: vec!["npm ci".to_string(), "npm test".to_string()],
            },
            written: WrittenArtifacts {
                recipe_path: PathBuf::from("/out/webapp_0123456.Dockerfile"),
                ignore_path: PathBuf::from("/src/webapp/.dockerignore"),
                image_tag: "webapp_0123456".to_string(),
                artifacts: GeneratedArtifacts {
                    recipe_text: "FROM node:18-alpine\n".to_string(),
                    ignore_entries: vec!["node_modules/".to_string()],
                },
            },
            build: None,
        };
        GenerationReport::new(&project, Path::new("/src/webapp/.github/workflows/ci.yml"), outcome)
    }

    #[test]
    fn test_json_format() {
        let report = create_test_report();
        let formatter = OutputFormatter::new(OutputFormat::Json);
        let output = formatter.format_generation(&report).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["project"], "webapp");
        assert_eq!(parsed["state"], "ArtifactsWritten");
        assert_eq!(parsed["spec"]["commands"][1], "npm test");
        assert_eq!(parsed["image_tag"], "webapp_0123456");
        assert!(parsed["build"].is_null());
    }

    #[test]
    fn test_yaml_format() {
        let report = create_test_report();
        let formatter = OutputFormatter::new(OutputFormat::Yaml);
        let output = formatter.format_generation(&report).unwrap();

        let parsed: serde_yaml::Value = serde_yaml::from_str(&output).unwrap();
        assert_eq!(parsed["project"].as_str(), Some("webapp"));
        assert_eq!(parsed["spec"]["runtime_version"].as_str(), Some("18"));
    }

    #[test]
    fn test_dockerfile_format() {
        let report = create_test_report();
        let formatter = OutputFormatter::new(OutputFormat::Dockerfile);
        assert_eq!(
            formatter.format_generation(&report).unwrap(),
            "FROM node:18-alpine\n"
        );
    }

    #[test]
    fn test_human_format() {
        let report = create_test_report();
        let formatter = OutputFormatter::new(OutputFormat::Human);
        let output = formatter.format_generation(&report).unwrap();

        assert!(output.contains("Reproduced job 'build' of webapp"));
        assert!(output.contains("Commit:    0123456789abcdef"));
        assert!(output.contains("Runtime:   18\n"));
        assert!(output.contains("\u{251C}\u{2500} npm ci"));
        assert!(output.contains("\u{2514}\u{2500} npm test"));
        assert!(output.contains("/out/webapp_0123456.Dockerfile"));
        assert!(output.contains("(1 entries)"));
        assert!(output.contains("Final state: ArtifactsWritten"));
    }

    #[test]
    fn test_human_format_with_build() {
        let mut report = create_test_report();
        report.state = PipelineState::BuildComplete;
        report.build = Some(BuildReport {
            image_tag: "webapp_0123456".to_string(),
            build: ExecutionOutput {
                exit_code: Some(0),
                stdout: "Successfully built\n".to_string(),
                stderr: String::new(),
            },
            run: None,
        });

        let output = OutputFormatter::new(OutputFormat::Human)
            .format_generation(&report)
            .unwrap();
        assert!(output.contains("Build: \u{2713} succeeded"));
        assert!(output.contains("  Successfully built"));
        assert!(!output.contains("Run:"));
    }

    #[test]
    fn test_jobs_format() {
        let document = WorkflowDocument::parse(
            "jobs:\n  build:\n    steps:\n      - uses: actions/setup-node@v4\n        with:\n          node-version: '20'\n      - run: npm ci\n  lint:\n    steps:\n      - run: npm run lint\n",
        )
        .unwrap();
        let extractor = BuildSpecExtractor::default();
        let table = extractor.extract_jobs(&document).unwrap();
        let listing = JobListing::new(Path::new("ci.yml"), &table, &extractor);

        let human = OutputFormatter::new(OutputFormat::Human)
            .format_jobs(&listing)
            .unwrap();
        assert!(human.contains("build  runtime 20, 2 step(s), 1 command(s)"));
        assert!(human.contains("lint   runtime lts (fallback), 1 step(s), 1 command(s)"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_jobs(&listing)
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["jobs"][0]["name"], "build");

        assert!(OutputFormatter::new(OutputFormat::Dockerfile)
            .format_jobs(&listing)
            .is_err());
    }

    #[test]
    fn test_config_format() {
        let config = ReproConfig {
            fallback_runtime: "lts".to_string(),
            base_image: "node:{version}-alpine".to_string(),
            workdir_root: "/app".to_string(),
            recipe_extension: "Dockerfile".to_string(),
            container_binary: "docker".to_string(),
            log_level: "info".to_string(),
        };
        let output = OutputFormatter::new(OutputFormat::Json)
            .format_config(&config)
            .unwrap();
        assert!(output.contains("node:{version}-alpine"));
    }
}
