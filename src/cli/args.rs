//! CLI argument definitions

use clap::{Args, Parser, Subcommand};
use std::ffi::OsString;
use std::path::PathBuf;

use inproc_config::{CliArgs, RepresentationMode};

/// inproc - run a command-line tool's entry point inside this process
#[derive(Parser, Debug)]
#[command(name = "inproc")]
#[command(about = "Run a command-line tool's entry point in-process and capture its output")]
#[command(long_about = r#"
inproc loads a tool from a shared library, calls its main-style entry point
once inside this process and captures what it writes to stdout and stderr.

EXAMPLES:
  # Run a tool and replay its output
  inproc run --library ./libtool.so -- --version

  # Use a wide (wchar_t) argument vector and a custom argv[0]
  inproc run --library tool.dll --wide --program-name curl -- -I https://example.com

  # Print the result record as JSON
  inproc run --library ./libtool.so --json -- --help

  # Show the effective configuration and where each value came from
  inproc config

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is --config PATH, else $INPROC_CONFIG, else the first
  .inproc/config.toml found searching upward from the current directory
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Invoke the tool once in-process and replay its output
    Run(RunArgs),

    /// Show the effective configuration with source attribution
    Config {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Shared library exporting the tool's entry point
    #[arg(long)]
    pub library: Option<PathBuf>,

    /// Exported entry point symbol (default: tool_main)
    #[arg(long)]
    pub entry: Option<String>,

    /// Export that accepts the capture write hook
    #[arg(long)]
    pub capture_hook: Option<String>,

    /// Pass a wide (wchar_t) argument vector
    #[arg(long, conflicts_with = "narrow")]
    pub wide: bool,

    /// Pass a narrow (char) argument vector
    #[arg(long)]
    pub narrow: bool,

    /// Synthetic argv[0] handed to the tool
    #[arg(long)]
    pub program_name: Option<String>,

    /// Initial stdout capture capacity in bytes
    #[arg(long)]
    pub stdout_initial_bytes: Option<usize>,

    /// Initial stderr capture capacity in bytes
    #[arg(long)]
    pub stderr_initial_bytes: Option<usize>,

    /// Ceiling on captured stdout; output past it is dropped
    #[arg(long)]
    pub stdout_max_bytes: Option<usize>,

    /// Ceiling on captured stderr; output past it is dropped
    #[arg(long)]
    pub stderr_max_bytes: Option<usize>,

    /// Print the invocation result as JSON instead of replaying output
    #[arg(long)]
    pub json: bool,

    /// Arguments passed to the tool
    #[arg(last = true)]
    pub args: Vec<OsString>,
}

impl RunArgs {
    fn representation(&self) -> Option<RepresentationMode> {
        match (self.wide, self.narrow) {
            (true, _) => Some(RepresentationMode::Wide),
            (_, true) => Some(RepresentationMode::Narrow),
            _ => None,
        }
    }
}

impl Cli {
    /// Configuration overrides carried by these arguments.
    #[must_use]
    pub fn cli_args(&self) -> CliArgs {
        let mut cli_args = CliArgs {
            config_path: self.config.clone(),
            verbose: self.verbose.then_some(true),
            ..CliArgs::default()
        };

        if let Commands::Run(run) = &self.command {
            cli_args.library = run.library.clone();
            cli_args.entry = run.entry.clone();
            cli_args.capture_hook = run.capture_hook.clone();
            cli_args.representation = run.representation();
            cli_args.program_name = run.program_name.clone();
            cli_args.stdout_initial_bytes = run.stdout_initial_bytes;
            cli_args.stderr_initial_bytes = run.stderr_initial_bytes;
            cli_args.stdout_max_bytes = run.stdout_max_bytes;
            cli_args.stderr_max_bytes = run.stderr_max_bytes;
        }

        cli_args
    }
}
