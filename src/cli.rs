//! Command-line interface definitions for templopt.
//!
//! Three command groups share the global options. Each group's action is an
//! optional nested subcommand; without one the group prints its dashboard
//! from the last persisted report and changes nothing.
//!
//! # Example
//!
//! ```bash
//! # Report duplicates as JSON
//! templopt dedupe scan --output json
//!
//! # Remove duplicates after taking a backup
//! templopt dedupe execute --yes
//!
//! # Score every component of one type
//! templopt qa test-type skills
//!
//! # Run analysis and QA only, without touching the tree
//! templopt pipeline custom --phases analysis,qa --dry-run
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::compliance::ComponentType;
use crate::orchestrator::PhaseKind;

/// Template registry optimizer.
///
/// Finds and removes duplicate template files, scores components against
/// the registry's compliance rules and runs phased maintenance pipelines.
#[derive(Debug, Parser)]
#[command(name = "templopt")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log errors only and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Print errors as JSON on stderr
    #[arg(long, global = true)]
    pub json_errors: bool,

    /// Configuration file (default: ./templopt.toml or the platform config dir)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Template root, overriding `templates_root`
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Find and eliminate duplicate template files
    Dedupe(DedupeArgs),
    /// Score template components for compliance
    Qa(QaArgs),
    /// Run the phased maintenance pipeline
    Pipeline(PipelineArgs),
}

#[derive(Debug, Args)]
pub struct DedupeArgs {
    #[command(subcommand)]
    pub action: Option<DedupeAction>,
}

#[derive(Debug, Subcommand)]
pub enum DedupeAction {
    /// Scan for exact duplicates
    Scan(ScanArgs),
    /// Scan, find near duplicates and persist the duplicate database
    Analyze,
    /// Show what execute would remove without changing anything
    Preview,
    /// Back up, remove duplicates and prune empty directories
    Execute(ExecuteArgs),
    /// Remove empty directories
    Clean,
    /// Show the last optimization report
    Dashboard,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    /// Also report near-duplicate text files
    #[arg(long)]
    pub deep: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ExecuteArgs {
    /// Delete without taking a backup first
    #[arg(long)]
    pub no_backup: bool,

    /// Confirm permanent deletion
    #[arg(short = 'y', long)]
    pub yes: bool,
}

#[derive(Debug, Args)]
pub struct QaArgs {
    #[command(subcommand)]
    pub action: Option<QaAction>,
}

#[derive(Debug, Subcommand)]
pub enum QaAction {
    /// Score every component
    TestAll,
    /// Score every component of one type
    TestType {
        #[arg(value_enum, value_name = "TYPE")]
        component_type: ComponentType,
    },
    /// Check a component name against the naming rules
    ValidateNaming {
        name: String,
    },
    /// Check one component directory for its required files
    ValidateStructure {
        path: PathBuf,

        /// Component type of the directory
        #[arg(long = "type", value_enum, value_name = "TYPE")]
        component_type: ComponentType,
    },
    /// Show the last QA report
    Dashboard,
}

#[derive(Debug, Args)]
pub struct PipelineArgs {
    #[command(subcommand)]
    pub action: Option<PipelineAction>,
}

#[derive(Debug, Subcommand)]
pub enum PipelineAction {
    /// Run every phase
    Full(RunArgs),
    /// Run the analysis phase
    Analysis(RunArgs),
    /// Run the installation phase
    Installation(RunArgs),
    /// Run quality assurance and final validation
    Qa(RunArgs),
    /// Run selected phases in pipeline order
    Custom(CustomArgs),
    /// Show the last execution report
    Dashboard,
}

#[derive(Debug, Clone, Copy, Default, Args)]
pub struct RunArgs {
    /// Preview elimination and skip installation writes and checkpoints
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Args)]
pub struct CustomArgs {
    /// Comma-separated phases, e.g. analysis,qa
    #[arg(long, value_enum, value_delimiter = ',', required = true)]
    pub phases: Vec<PhaseKind>,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Output format for scan results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// JSON for scripting
    Json,
    /// CSV for spreadsheets
    Csv,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Csv => write!(f, "csv"),
        }
    }
}
