//! The invocation orchestrator

use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use inproc_argv::{ArgumentMarshaller, ConversionError};
use inproc_capture::{CaptureBuffer, CaptureScope};
use inproc_utils::logging::invocation_span;
use tracing::{debug, info};

use crate::entry::{EntryKind, EntryPoint};
use crate::result::InvocationResult;

/// Capture buffer sizing for a [`Runner`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Seed capacity for stdout (default: 64 KiB)
    pub stdout_initial_bytes: usize,
    /// Seed capacity for stderr (default: 16 KiB)
    pub stderr_initial_bytes: usize,
    /// Optional ceiling on captured stdout
    pub stdout_max_bytes: Option<usize>,
    /// Optional ceiling on captured stderr
    pub stderr_max_bytes: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stdout_initial_bytes: 64 * 1024, // 64 KiB
            stderr_initial_bytes: 16 * 1024, // 16 KiB
            stdout_max_bytes: None,
            stderr_max_bytes: None,
        }
    }
}

static INVOCATION_LOCK: Mutex<()> = Mutex::new(());

/// Runs an embedded entry point in-process.
///
/// The runner owns one capture buffer per stream. Each [`run`](Self::run)
/// installs them, calls the entry point once and then resets them, so their
/// grown capacity carries over to the next invocation.
#[derive(Debug)]
pub struct Runner {
    entry: EntryPoint,
    marshaller: ArgumentMarshaller,
    config: RunnerConfig,
    stdout: CaptureBuffer,
    stderr: CaptureBuffer,
}

impl Runner {
    /// Create a runner with default buffer sizes and program name.
    pub fn new(entry: EntryPoint) -> Self {
        Self::with_config(entry, RunnerConfig::default())
    }

    pub fn with_config(entry: EntryPoint, config: RunnerConfig) -> Self {
        let stdout =
            CaptureBuffer::new(config.stdout_initial_bytes).with_max_bytes(config.stdout_max_bytes);
        let stderr =
            CaptureBuffer::new(config.stderr_initial_bytes).with_max_bytes(config.stderr_max_bytes);
        Self {
            entry,
            marshaller: ArgumentMarshaller::default(),
            config,
            stdout,
            stderr,
        }
    }

    /// Replace the argument marshaller (program name and conversion chain).
    #[must_use]
    pub fn with_marshaller(mut self, marshaller: ArgumentMarshaller) -> Self {
        self.marshaller = marshaller;
        self
    }

    pub fn entry(&self) -> EntryPoint {
        self.entry
    }

    pub fn marshaller(&self) -> &ArgumentMarshaller {
        &self.marshaller
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Current capacities of the held `(stdout, stderr)` buffers.
    pub fn buffer_capacities(&self) -> (usize, usize) {
        (self.stdout.capacity(), self.stderr.capacity())
    }

    /// Invoke the entry point once with `args` (program name excluded).
    ///
    /// Conversion failures do not call the entry point; the result then
    /// carries the error and its exit code. This takes no lock: concurrent
    /// calls from other threads share the process-wide capture slots.
    pub fn run<I, S>(&mut self, args: I) -> InvocationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let representation = self.entry.representation();
        let span = invocation_span(
            self.marshaller.program_name(),
            args.len() + 1,
            representation.as_str(),
        );
        let _guard = span.enter();

        let start = Instant::now();
        let scope = CaptureScope::install(
            std::mem::take(&mut self.stdout),
            std::mem::take(&mut self.stderr),
        );

        let status = self.call(&args);

        let (mut stdout, mut stderr) = scope.finish();
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let mut result = match status {
            Ok(exit_code) => InvocationResult::new(exit_code, stdout.to_vec(), stderr.to_vec()),
            Err(error) => {
                debug!(error = %error, "Entry point not called");
                InvocationResult::from_conversion_error(error, stdout.to_vec(), stderr.to_vec())
            }
        };
        result.stdout_dropped_bytes = stdout.dropped_bytes();
        result.stderr_dropped_bytes = stderr.dropped_bytes();

        info!(
            exit_code = result.exit_code,
            duration_ms,
            stdout_bytes = result.stdout.len(),
            stderr_bytes = result.stderr.len(),
            "Invocation finished"
        );
        if result.output_truncated() {
            debug!(
                stdout_dropped_bytes = result.stdout_dropped_bytes,
                stderr_dropped_bytes = result.stderr_dropped_bytes,
                "Invocation output was truncated"
            );
        }

        stdout.reset();
        stderr.reset();
        self.stdout = stdout;
        self.stderr = stderr;
        result
    }

    /// [`run`](Self::run) while holding a process-wide invocation lock.
    ///
    /// Every caller that goes through this method is serialised against the
    /// others, so their outputs never mix.
    pub fn run_serialized<I, S>(&mut self, args: I) -> InvocationResult
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let _lock = INVOCATION_LOCK
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        self.run(args)
    }

    fn call<S: AsRef<[u8]>>(&self, args: &[S]) -> Result<i32, ConversionError> {
        // Each native vector is released when its closure returns, after the
        // entry point is done with it.
        match self.entry.kind {
            EntryKind::Narrow(main) => self.marshaller.to_narrow(args).map(|mut argv| {
                debug!(argc = argv.argc(), "Calling narrow entry point");
                // SAFETY: `EntryPoint::narrow` requires `main` to accept a
                // marshalled argc/argv; `argv` outlives the call.
                unsafe { main(argv.argc(), argv.as_mut_ptr()) }
            }),
            EntryKind::Wide(main) => self.marshaller.to_wide(args).map(|mut argv| {
                debug!(argc = argv.argc(), "Calling wide entry point");
                // SAFETY: as above, via `EntryPoint::wide`.
                unsafe { main(argv.argc(), argv.as_mut_ptr()) }
            }),
        }
    }
}
