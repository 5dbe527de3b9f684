//! Logging infrastructure for inproc
//!
//! Structured logging goes through `tracing`. The subscriber always writes to
//! the host's real stderr: diagnostics about an invocation must never end up
//! inside the capture buffers of that invocation.

use std::io::IsTerminal;
use tracing::{Level, span};
use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Check if colored output should be used.
///
/// Returns true only if:
/// - stderr is a terminal (TTY)
/// - NO_COLOR environment variable is not set
fn use_color() -> bool {
    std::io::stderr().is_terminal() && std::env::var_os("NO_COLOR").is_none()
}

/// Filter directive used when `RUST_LOG` is not set.
#[must_use]
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "inproc=debug,info"
    } else {
        "inproc=info,warn"
    }
}

/// Initialize tracing subscriber for structured logging
///
/// Sets up tracing with either compact (default) or verbose format. Verbose
/// format includes targets and closes invocation spans with their timing.
///
/// # Arguments
/// * `verbose` - If true, use verbose format with structured fields
///
/// # Errors
/// Fails if a global subscriber has already been installed.
pub fn init_tracing(verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter(verbose)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if verbose {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(use_color())
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_thread_names(false)
                    .with_line_number(false)
                    .with_file(false)
                    .compact(),
            )
            .try_init()?;
    }

    Ok(())
}

/// Create a span covering one tool invocation.
///
/// # Arguments
/// * `tool` - Display name of the tool (its synthetic program name)
/// * `argc` - Argument count handed to the entry point, program name included
/// * `representation` - `narrow` or `wide`
pub fn invocation_span(tool: &str, argc: usize, representation: &str) -> tracing::Span {
    span!(
        Level::DEBUG,
        "invocation",
        tool = %tool,
        argc = argc,
        representation = %representation,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_levels() {
        assert_eq!(default_filter(false), "inproc=info,warn");
        assert_eq!(default_filter(true), "inproc=debug,info");
    }

    #[test]
    fn test_default_filters_parse() {
        assert!(EnvFilter::try_new(default_filter(false)).is_ok());
        assert!(EnvFilter::try_new(default_filter(true)).is_ok());
    }

    #[test]
    fn test_invocation_span_without_subscriber() {
        // Spans are inert without a subscriber but must still be constructible.
        let span = invocation_span("tool", 3, "narrow");
        let _guard = span.enter();
    }

    #[test]
    fn test_init_tracing_twice_fails() {
        // The first call may also fail if another test installed a subscriber;
        // a second call in the same process never succeeds.
        let _ = init_tracing(false);
        assert!(init_tracing(true).is_err());
    }
}
