//! Error types for runner module

use inproc_utils::ExitCode;
use thiserror::Error;

/// Errors raised while preparing an invocation.
///
/// A tool that runs and fails is not an error here: its status is reported
/// through [`InvocationResult`](crate::InvocationResult).
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Failed to load tool library '{path}': {reason}")]
    LibraryLoad { path: String, reason: String },

    #[error("Symbol '{symbol}' not found in tool library: {reason}")]
    SymbolNotFound { symbol: String, reason: String },
}

impl RunnerError {
    /// Exit code the CLI reports for this error.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::LibraryLoad { .. } | Self::SymbolNotFound { .. } => ExitCode::LIBRARY_LOAD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_error_exit_codes() {
        let err = RunnerError::LibraryLoad {
            path: "/missing/libtool.so".to_string(),
            reason: "not found".to_string(),
        };
        assert_eq!(err.exit_code(), ExitCode::LIBRARY_LOAD);
        assert!(err.to_string().contains("/missing/libtool.so"));

        let err = RunnerError::SymbolNotFound {
            symbol: "tool_main".to_string(),
            reason: "undefined".to_string(),
        };
        assert_eq!(err.exit_code(), ExitCode::LIBRARY_LOAD);
    }
}
