use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Reproduce a CI job as a local container build
#[derive(Parser, Debug)]
#[command(
    name = "reprobox",
    about = "Reproduce a CI job as a local container build",
    version,
    author,
    long_about = "reprobox reads a CI workflow definition, extracts the runtime version and \
                  commands of one job, and writes a build recipe and a .dockerignore that \
                  reproduce that job in a container. It can optionally build and run the \
                  resulting image."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a build recipe from a CI job",
        long_about = "Extracts the selected job of a workflow file and writes the recipe file \
                      (to the output directory) and .dockerignore (to the project root).\n\n\
                      When the project has a single workflow or the workflow a single job, it \
                      is selected automatically; otherwise --workflow / --job must be given.\n\n\
                      Examples:\n  \
                      reprobox generate\n  \
                      reprobox generate /path/to/project --job build\n  \
                      reprobox generate -w .github/workflows/ci.yml -j test --commit v1.2.0\n  \
                      reprobox generate --build --run"
    )]
    Generate(GenerateArgs),

    #[command(
        about = "List the jobs of a workflow",
        long_about = "Lists every job of a workflow file with its resolved runtime version \
                      and command count.\n\n\
                      Examples:\n  \
                      reprobox jobs\n  \
                      reprobox jobs /path/to/project -w .circleci/config.yml --format json"
    )]
    Jobs(JobsArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the project (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'w',
        long,
        value_name = "FILE",
        help = "Workflow file, absolute or relative to the project"
    )]
    pub workflow: Option<PathBuf>,

    #[arg(short = 'j', long, value_name = "JOB", help = "Job to reproduce")]
    pub job: Option<String>,

    #[arg(
        short = 'c',
        long,
        value_name = "REV",
        help = "Check out this revision before generating"
    )]
    pub commit: Option<String>,

    #[arg(
        short = 'o',
        long,
        value_name = "NAME",
        help = "Recipe file name (defaults to <project>[_<commit>].Dockerfile)"
    )]
    pub output_name: Option<String>,

    #[arg(
        long,
        value_name = "DIR",
        help = "Directory for the recipe file (defaults to current directory)"
    )]
    pub output_dir: Option<PathBuf>,

    #[arg(
        long = "ignore",
        value_name = "PATTERN",
        help = "Additional .dockerignore entry (repeatable)"
    )]
    pub extra_ignore: Vec<String>,

    #[arg(long, help = "Build the image after writing the recipe")]
    pub build: bool,

    #[arg(long, help = "Run the image after building (implies --build)")]
    pub run: bool,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct JobsArgs {
    #[arg(
        value_name = "PATH",
        help = "Path to the project (defaults to current directory)"
    )]
    pub project_path: Option<PathBuf>,

    #[arg(
        short = 'w',
        long,
        value_name = "FILE",
        help = "Workflow file, absolute or relative to the project"
    )]
    pub workflow: Option<PathBuf>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Yaml,
    Human,
    Dockerfile,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Yaml => super::output::OutputFormat::Yaml,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
            OutputFormatArg::Dockerfile => super::output::OutputFormat::Dockerfile,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_generate_args() {
        let args = CliArgs::parse_from(["reprobox", "generate"]);
        match args.command {
            Commands::Generate(generate_args) => {
                assert_eq!(generate_args.format, OutputFormatArg::Human);
                assert!(generate_args.project_path.is_none());
                assert!(generate_args.workflow.is_none());
                assert!(generate_args.job.is_none());
                assert!(generate_args.commit.is_none());
                assert!(generate_args.extra_ignore.is_empty());
                assert!(!generate_args.build);
                assert!(!generate_args.run);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_with_options() {
        let args = CliArgs::parse_from([
            "reprobox",
            "generate",
            "/tmp/webapp",
            "-w",
            ".github/workflows/ci.yml",
            "-j",
            "test",
            "-c",
            "abc1234",
            "-o",
            "custom.Dockerfile",
            "--output-dir",
            "/tmp/out",
            "--ignore",
            "dist/",
            "--ignore",
            "*.log",
            "--build",
            "--run",
            "--format",
            "json",
        ]);

        match args.command {
            Commands::Generate(generate_args) => {
                assert_eq!(generate_args.project_path, Some(PathBuf::from("/tmp/webapp")));
                assert_eq!(
                    generate_args.workflow,
                    Some(PathBuf::from(".github/workflows/ci.yml"))
                );
                assert_eq!(generate_args.job.as_deref(), Some("test"));
                assert_eq!(generate_args.commit.as_deref(), Some("abc1234"));
                assert_eq!(generate_args.output_name.as_deref(), Some("custom.Dockerfile"));
                assert_eq!(generate_args.output_dir, Some(PathBuf::from("/tmp/out")));
                assert_eq!(generate_args.extra_ignore, vec!["dist/", "*.log"]);
                assert!(generate_args.build);
                assert!(generate_args.run);
                assert_eq!(generate_args.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_jobs_command() {
        let args = CliArgs::parse_from(["reprobox", "jobs", "/tmp/webapp", "-f", "yaml"]);
        match args.command {
            Commands::Jobs(jobs_args) => {
                assert_eq!(jobs_args.project_path, Some(PathBuf::from("/tmp/webapp")));
                assert_eq!(jobs_args.format, OutputFormatArg::Yaml);
            }
            _ => panic!("Expected Jobs command"),
        }
    }

    #[test]
    fn test_config_command() {
        let args = CliArgs::parse_from(["reprobox", "config"]);
        assert!(matches!(args.command, Commands::Config(_)));
    }

    #[test]
    fn test_global_verbose_flag() {
        let args = CliArgs::parse_from(["reprobox", "-v", "generate"]);
        assert!(args.verbose);
        assert!(!args.quiet);
    }

    #[test]
    fn test_global_quiet_flag() {
        let args = CliArgs::parse_from(["reprobox", "jobs", "-q"]);
        assert!(!args.verbose);
        assert!(args.quiet);
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = CliArgs::try_parse_from(["reprobox", "-v", "-q", "generate"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_log_level_flag() {
        let args = CliArgs::parse_from(["reprobox", "--log-level", "debug", "generate"]);
        assert_eq!(args.log_level, Some("debug".to_string()));
    }
}
