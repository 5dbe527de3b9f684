//! In-process invocation of a command-line tool's entry point
//!
//! A [`Runner`] installs a pair of capture buffers, marshals the host's UTF-8
//! arguments into the `argv` the entry point expects, calls the entry point
//! once on the current thread and returns an [`InvocationResult`].
//!
//! # Single flight
//!
//! Capture targets are process-wide, so two invocations running at the same
//! time append into each other's buffers. Hosts that call from several
//! threads should use [`Runner::run_serialized`] or hold their own lock.

pub mod entry;
pub mod error;
pub mod library;
pub mod result;
pub mod runner;

pub use entry::{EntryPoint, NarrowMain, WideMain};
pub use error::RunnerError;
pub use library::ToolLibrary;
pub use result::InvocationResult;
pub use runner::{Runner, RunnerConfig};
