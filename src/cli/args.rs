//! CLI argument definitions using clap derive
//!
//! Defines all command-line arguments and subcommands.

use crate::device::BackendKind;
use crate::observe::RecordFormat;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// Utilization-driven GPU power limit governor
///
/// Lowers the power limit of an idle NVIDIA GPU and raises it again when
/// the GPU is saturated.
#[derive(Parser, Debug)]
#[command(name = "gpuleaf")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GPULEAF_CONFIG")]
    pub config: Option<String>,

    /// Target GPU by index (0-based)
    #[arg(long, global = true)]
    pub gpu: Option<u32>,

    /// Dry run mode - compute and report limits without applying them
    #[arg(long, global = true)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the power governor loop
    Run(RunArgs),

    /// Show power bounds and current telemetry
    Status(StatusArgs),

    /// Evaluate the control law once without touching a GPU
    Decide(DecideArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
pub struct RunArgs {
    /// Polling interval in milliseconds
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_ms: Option<u64>,

    /// Utilization percentage at or above which the limit is raised
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(0..=100))]
    pub threshold: Option<u32>,

    /// Allow raising the limit up to the device maximum instead of the default
    #[arg(long = "oc")]
    pub overclock: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    /// Append tick records to this file
    #[arg(long, value_name = "FILE", conflicts_with = "no_log_file")]
    pub log_file: Option<PathBuf>,

    /// Do not write tick records to a file
    #[arg(long)]
    pub no_log_file: bool,

    /// Do not log tick records to the console
    #[arg(short, long)]
    pub quiet: bool,

    /// Format of records written to the log file
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormatArg>,

    /// Stop with an error after this many failed samples in a row
    #[arg(long, value_name = "N")]
    pub max_failures: Option<u32>,

    /// Stop after this many ticks
    #[arg(long, value_name = "N")]
    pub ticks: Option<u64>,
}

/// Arguments for the status command
#[derive(Parser, Debug, Default)]
pub struct StatusArgs {
    #[command(flatten)]
    pub backend: BackendArgs,
}

/// Backend selection shared by commands that talk to a GPU
#[derive(clap::Args, Debug, Default, Clone)]
pub struct BackendArgs {
    /// Transport used to query and control the GPU
    #[arg(long, value_enum)]
    pub backend: Option<BackendArg>,

    /// Path to the nvidia-smi executable
    #[arg(long, value_name = "PATH")]
    pub smi_path: Option<String>,
}

/// Arguments for the decide command
#[derive(Parser, Debug)]
pub struct DecideArgs {
    /// Lowest limit in watts
    #[arg(long)]
    pub min: f64,

    /// Effective ceiling in watts
    #[arg(long)]
    pub max: f64,

    /// Current power limit in watts
    #[arg(long)]
    pub limit: f64,

    /// GPU utilization percentage
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub utilization: u8,

    /// Utilization threshold percentage
    #[arg(
        short,
        long,
        default_value = "95",
        value_parser = clap::value_parser!(u32).range(0..=100)
    )]
    pub threshold: u32,
}

/// Backend argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum BackendArg {
    /// Spawn nvidia-smi for every query
    Smi,
    /// Call NVML directly
    Nvml,
}

impl From<BackendArg> for BackendKind {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Smi => BackendKind::Smi,
            BackendArg::Nvml => BackendKind::Nvml,
        }
    }
}

/// Log file format argument
#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum LogFormatArg {
    /// One human-readable line per tick
    Text,
    /// One JSON object per tick
    Json,
}

impl From<LogFormatArg> for RecordFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Text => RecordFormat::Text,
            LogFormatArg::Json => RecordFormat::Json,
        }
    }
}

/// Output format
#[derive(ValueEnum, Debug, Clone, Copy, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format for machine parsing
    Json,
    /// Compact single-line format
    Compact,
}

/// Generate shell completions and print to stdout
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout());
}
