//! inproc - run a command-line tool's entry point inside the calling process
//!
//! A tool that normally runs as its own executable is linked (or loaded) as a
//! library, and its `main`-shaped entry point is called directly. Each
//! invocation gets a freshly built `argv`, and everything the tool writes to
//! its console is captured into per-stream buffers instead of reaching the
//! terminal.
//!
//! inproc can be used in two ways:
//! - **CLI**: `inproc run --library PATH -- ARGS...`
//! - **Library**: build a [`Runner`] around an [`EntryPoint`] and call
//!   [`Runner::run`]
//!
//! # Quick Start (Library)
//!
//! ```no_run
//! use std::ffi::c_int;
//! use inproc::{EntryPoint, NarrowChar, Runner};
//!
//! unsafe extern "C" fn tool_main(_argc: c_int, _argv: *mut *mut NarrowChar) -> c_int {
//!     inproc::capture::write(inproc::Stream::Stdout, b"OK\n");
//!     0
//! }
//!
//! // SAFETY: `tool_main` reads at most `argc` elements of `argv`.
//! let entry = unsafe { EntryPoint::narrow(tool_main) };
//! let mut runner = Runner::new(entry);
//! let result = runner.run(["--dummy"]);
//! assert_eq!(result.exit_code, 0);
//! assert_eq!(result.stdout, b"OK\n");
//! ```
//!
//! # Single-flight
//!
//! Capture is process-wide. Use [`Runner::run_serialized`] (or your own lock)
//! when more than one thread may invoke a tool.

pub mod cli;

/// Output capture: buffers, the process-wide registry and the C write hook.
pub mod capture {
    pub use inproc_capture::*;
}

/// Argument vector construction.
pub mod argv {
    pub use inproc_argv::*;
}

pub use inproc_argv::{
    ArgumentMarshaller, ConversionChain, ConversionError, ConversionStage, NarrowChar, NativeArgv,
    Representation, WideChar,
};
pub use inproc_capture::{CaptureBuffer, Stream};
pub use inproc_config::{CliArgs, Config, ConfigError, ConfigSource};
pub use inproc_runner::{
    EntryPoint, InvocationResult, Runner, RunnerConfig, RunnerError, ToolLibrary,
};
pub use inproc_utils::ExitCode;
