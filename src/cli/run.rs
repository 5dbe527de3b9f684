//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers configuration, dispatches to the
//! command and prints every error itself. It returns the exit code for
//! main.rs to pass to `std::process::exit`.

use clap::Parser;
use tracing::debug;

use inproc_config::{Config, ConfigError};
use inproc_runner::RunnerError;
use inproc_utils::ExitCode;
use inproc_utils::logging::init_tracing;

use super::args::{Cli, Commands};
use super::commands;

/// Main CLI execution function.
///
/// Returns `Ok(())` when the command succeeded (and the tool returned 0),
/// otherwise the code the process should exit with.
pub fn run() -> Result<(), ExitCode> {
    dispatch(Cli::parse())
}

/// Execute already-parsed arguments.
pub fn dispatch(cli: Cli) -> Result<(), ExitCode> {
    let cli_args = cli.cli_args();

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("✗ Configuration error: {err:#}");
            return Err(ExitCode::CLI_ARGS);
        }
    };

    if let Err(err) = init_tracing(config.verbose()) {
        // A subscriber is already installed when embedded in a host process.
        debug!(error = %err, "Tracing subscriber not installed");
    }

    let (operation, result) = match cli.command {
        Commands::Run(args) => (
            "run",
            commands::execute_run_command(&config, &args.args, args.json),
        ),
        Commands::Config { json } => (
            "config",
            commands::execute_config_command(&config, json).map(|()| ExitCode::SUCCESS),
        ),
    };

    match result {
        Ok(code) if code.is_success() => Ok(()),
        Ok(code) => Err(code),
        Err(error) => {
            eprintln!("✗ {operation} failed: {error:#}");
            Err(exit_code_for(&error))
        }
    }
}

/// Map a command failure to the exit code table.
fn exit_code_for(error: &anyhow::Error) -> ExitCode {
    if let Some(runner_error) = error.downcast_ref::<RunnerError>() {
        runner_error.exit_code()
    } else if error.downcast_ref::<ConfigError>().is_some() {
        ExitCode::CLI_ARGS
    } else {
        ExitCode::INTERNAL
    }
}
