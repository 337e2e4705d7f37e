pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, GenerateArgs, JobsArgs, OutputFormatArg};
pub use output::{GenerationReport, JobListing, JobSummary, OutputFormat, OutputFormatter};
