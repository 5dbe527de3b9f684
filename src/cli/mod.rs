//! Command-line interface for inproc
//!
//! ## Module Structure
//!
//! - `args`: CLI argument definitions (clap)
//! - `run`: entry point, configuration and error reporting
//! - `commands`: `run` and `config` command implementations

pub mod args;
mod commands;
mod run;


pub use args::{Cli, Commands, RunArgs};
pub use run::{dispatch, run};
