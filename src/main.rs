//! gpuleaf - utilization-driven GPU power limit governor
//!
//! A command-line tool that keeps an NVIDIA GPU's power limit low while it
//! idles and raises it when the GPU is saturated.

use clap::Parser;
use gpuleaf::cli::args::{generate_completions, Cli, Commands};
use gpuleaf::commands::{run_decide, run_governor, run_status};
use gpuleaf::config::ConfigBuilder;
use gpuleaf::error::{AppError, CapabilityError, NvmlError};

fn main() {
    let cli = Cli::parse();

    // Tick records are logged at info, so the governor shows them by default
    let default_level = match (&cli.command, cli.verbose) {
        (_, true) => "debug",
        (Commands::Run(_), false) => "info",
        _ => "warn",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();

    if let Err(e) = run(&cli) {
        print_error(&e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    match &cli.command {
        Commands::Run(args) => run_governor(args, base_config(cli)?, cli.format),

        Commands::Status(args) => run_status(args, base_config(cli)?, cli.format),

        Commands::Decide(args) => run_decide(args, cli.format),

        Commands::Completions { shell } => {
            generate_completions(*shell);
            Ok(())
        }
    }
}

/// Configuration file merged with the global flags
fn base_config(cli: &Cli) -> Result<ConfigBuilder, AppError> {
    Ok(ConfigBuilder::new()
        .with_file(cli.config.as_deref())?
        .with_dry_run(cli.dry_run.then_some(true))
        .with_gpu_index(cli.gpu))
}

fn print_error(err: &AppError) {
    eprintln!("Error: {}", err);

    // Print helpful hints for common errors
    match err {
        AppError::Nvml(NvmlError::LibraryNotFound) => {
            eprintln!();
            eprintln!("Hint: Make sure the NVIDIA driver is installed.");
            eprintln!("      Or use the nvidia-smi backend with '--backend smi'.");
        }
        AppError::Nvml(NvmlError::InsufficientPermissions(_)) => {
            eprintln!();
            eprintln!("Hint: Changing power limits requires root. Try running with sudo.");
        }
        AppError::Capability(CapabilityError::NotManageable(_)) => {
            eprintln!();
            eprintln!("Hint: Check 'nvidia-smi -q -d POWER' for 'Power Limit' support.");
        }
        AppError::Capability(CapabilityError::Unavailable(_)) => {
            eprintln!();
            eprintln!("Hint: Make sure nvidia-smi is installed and on PATH,");
            eprintln!("      or point --smi-path at it.");
        }
        _ => {}
    }
}
