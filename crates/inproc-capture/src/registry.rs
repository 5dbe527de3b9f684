//! Process-wide capture registry
//!
//! The embedded tool has exactly one console per stream, so the registry has
//! exactly one slot per stream. A [`CaptureScope`] swaps a pair of buffers
//! into the slots and swaps the previous occupants back when it finishes or
//! is dropped, on every exit path.

use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::buffer::CaptureBuffer;

/// The console streams the embedded tool writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Standard output (file descriptor 1)
    Stdout,
    /// Standard error (file descriptor 2)
    Stderr,
}

impl Stream {
    /// Map a console file descriptor to a stream.
    #[must_use]
    pub const fn from_fd(fd: i32) -> Option<Self> {
        match fd {
            1 => Some(Self::Stdout),
            2 => Some(Self::Stderr),
            _ => None,
        }
    }

    /// File descriptor the stream stands for.
    #[must_use]
    pub const fn fd(self) -> i32 {
        match self {
            Self::Stdout => 1,
            Self::Stderr => 2,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdout => "stdout",
            Self::Stderr => "stderr",
        }
    }
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

struct Slots {
    stdout: Option<CaptureBuffer>,
    stderr: Option<CaptureBuffer>,
}

impl Slots {
    fn get_mut(&mut self, stream: Stream) -> &mut Option<CaptureBuffer> {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }
}

static ACTIVE: Mutex<Slots> = Mutex::new(Slots {
    stdout: None,
    stderr: None,
});

// Slots hold plain buffers that are consistent between calls, so a panic
// while the lock was held leaves nothing half-written.
fn slots() -> MutexGuard<'static, Slots> {
    ACTIVE.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the active buffer for `stream`, returning the previous one.
///
/// Passing `None` deactivates capture for the stream. Prefer
/// [`CaptureScope`], which restores the previous buffer automatically.
pub fn set_active(stream: Stream, buffer: Option<CaptureBuffer>) -> Option<CaptureBuffer> {
    std::mem::replace(slots().get_mut(stream), buffer)
}

/// Check whether output for `stream` is currently captured.
#[must_use]
pub fn is_active(stream: Stream) -> bool {
    slots().get_mut(stream).is_some()
}

/// Write console output for `stream`.
///
/// Appends to the active buffer when there is one. Otherwise the bytes go to
/// the host's real stream, which is where the tool would have written them.
pub fn write(stream: Stream, bytes: &[u8]) {
    let mut slots = slots();
    if let Some(buffer) = slots.get_mut(stream) {
        buffer.append(bytes);
        return;
    }
    drop(slots);

    // A console write that fails has nowhere to report to.
    let _ = match stream {
        Stream::Stdout => io::stdout().lock().write_all(bytes),
        Stream::Stderr => io::stderr().lock().write_all(bytes),
    };
}

/// Scoped installation of a stdout/stderr buffer pair.
///
/// While the scope lives, console output from the embedded tool accumulates
/// in the installed buffers. [`finish`](Self::finish) hands the buffers back
/// and reinstates whatever was active before; dropping an unfinished scope
/// reinstates the previous buffers and discards the scope's own.
#[must_use = "dropping the scope immediately uninstalls the buffers"]
pub struct CaptureScope {
    previous_stdout: Option<CaptureBuffer>,
    previous_stderr: Option<CaptureBuffer>,
    finished: bool,
}

impl CaptureScope {
    /// Install `stdout` and `stderr` as the active buffers.
    pub fn install(stdout: CaptureBuffer, stderr: CaptureBuffer) -> Self {
        let mut slots = slots();
        let previous_stdout = slots.stdout.replace(stdout);
        let previous_stderr = slots.stderr.replace(stderr);
        drop(slots);

        if previous_stdout.is_some() || previous_stderr.is_some() {
            debug!("Capture scope nested inside an active capture; outer buffers parked");
        }

        Self {
            previous_stdout,
            previous_stderr,
            finished: false,
        }
    }

    /// Uninstall the scope's buffers and return them as `(stdout, stderr)`.
    pub fn finish(mut self) -> (CaptureBuffer, CaptureBuffer) {
        let (stdout, stderr) = self.restore();
        self.finished = true;
        (stdout.unwrap_or_default(), stderr.unwrap_or_default())
    }

    fn restore(&mut self) -> (Option<CaptureBuffer>, Option<CaptureBuffer>) {
        let mut slots = slots();
        let stdout = std::mem::replace(&mut slots.stdout, self.previous_stdout.take());
        let stderr = std::mem::replace(&mut slots.stderr, self.previous_stderr.take());
        (stdout, stderr)
    }
}

impl Drop for CaptureScope {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.restore();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_stream_fd_mapping() {
        assert_eq!(Stream::from_fd(1), Some(Stream::Stdout));
        assert_eq!(Stream::from_fd(2), Some(Stream::Stderr));
        assert_eq!(Stream::from_fd(0), None);
        assert_eq!(Stream::from_fd(3), None);
        assert_eq!(Stream::Stdout.fd(), 1);
        assert_eq!(Stream::Stderr.to_string(), "stderr");
    }

    #[test]
    #[serial]
    fn test_scope_captures_both_streams() {
        let scope = CaptureScope::install(CaptureBuffer::new(8), CaptureBuffer::new(8));
        assert!(is_active(Stream::Stdout));
        assert!(is_active(Stream::Stderr));

        write(Stream::Stdout, b"out-1 ");
        write(Stream::Stderr, b"err");
        write(Stream::Stdout, b"out-2");

        let (stdout, stderr) = scope.finish();
        assert_eq!(stdout.as_bytes(), b"out-1 out-2");
        assert_eq!(stderr.as_bytes(), b"err");
        assert!(!is_active(Stream::Stdout));
        assert!(!is_active(Stream::Stderr));
    }

    #[test]
    #[serial]
    fn test_nested_scope_restores_outer_buffers() {
        let outer = CaptureScope::install(CaptureBuffer::new(8), CaptureBuffer::new(8));
        write(Stream::Stdout, b"outer ");

        let inner = CaptureScope::install(CaptureBuffer::new(8), CaptureBuffer::new(8));
        write(Stream::Stdout, b"inner");
        let (inner_out, _) = inner.finish();

        write(Stream::Stdout, b"again");
        let (outer_out, _) = outer.finish();

        assert_eq!(inner_out.as_bytes(), b"inner");
        assert_eq!(outer_out.as_bytes(), b"outer again");
    }

    #[test]
    #[serial]
    fn test_dropped_scope_uninstalls() {
        {
            let _scope = CaptureScope::install(CaptureBuffer::new(8), CaptureBuffer::new(8));
            assert!(is_active(Stream::Stdout));
        }
        assert!(!is_active(Stream::Stdout));
        assert!(!is_active(Stream::Stderr));
    }

    #[test]
    #[serial]
    fn test_set_active_swaps_single_stream() {
        let previous = set_active(Stream::Stderr, Some(CaptureBuffer::new(4)));
        assert!(previous.is_none());
        assert!(is_active(Stream::Stderr));
        assert!(!is_active(Stream::Stdout));

        write(Stream::Stderr, b"warning");
        let buffer = set_active(Stream::Stderr, None).unwrap();
        assert_eq!(buffer.as_bytes(), b"warning");
        assert!(!is_active(Stream::Stderr));
    }
}
