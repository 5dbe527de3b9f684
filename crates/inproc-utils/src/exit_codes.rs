//! Exit code constants for inproc.
//!
//! Two families of codes live here. The first is the table the `inproc` binary
//! itself exits with when something fails before or around the embedded tool.
//! The second is the pair of codes an invocation reports in place of the
//! tool's own status when its argument vector could not be built; those values
//! follow the embedded tool's own convention (`2` for a failed init, `27` for
//! out of memory) so hosts can treat them like any other tool status.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed successfully |
//! | 1 | `INTERNAL` | General/internal failure |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `LIBRARY_LOAD` | Tool library or symbol could not be loaded |
//!
//! When the tool runs, `inproc run` exits with whatever the tool returned.

/// Exit codes for the `inproc` binary.
///
/// Use the named constants for common exit codes, or [`as_i32()`](Self::as_i32)
/// to get the numeric value for `std::process::exit()`.
///
/// # Example
///
/// ```rust
/// use inproc_utils::ExitCode;
///
/// let code = ExitCode::SUCCESS;
/// assert_eq!(code.as_i32(), 0);
///
/// assert_eq!(ExitCode::LIBRARY_LOAD, ExitCode::from_i32(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - operation completed successfully
    pub const SUCCESS: ExitCode = ExitCode(codes::SUCCESS);

    /// Internal error - general failure
    pub const INTERNAL: ExitCode = ExitCode(codes::INTERNAL);

    /// CLI arguments error - invalid or missing arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(codes::CLI_ARGS);

    /// Library load failure - the tool library or one of its symbols is missing
    pub const LIBRARY_LOAD: ExitCode = ExitCode(codes::LIBRARY_LOAD);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an `ExitCode` from a raw i32 value.
    ///
    /// Prefer using the named constants when possible. Tool statuses pass
    /// through this constructor unchanged.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Whether this code denotes success.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == codes::SUCCESS
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw exit code values.
pub mod codes {
    /// Success - operation completed successfully
    pub const SUCCESS: i32 = 0;

    /// Internal error - general failure
    pub const INTERNAL: i32 = 1;

    /// CLI arguments error - invalid or missing arguments or configuration
    pub const CLI_ARGS: i32 = 2;

    /// Library load failure - the tool library or one of its symbols is missing
    pub const LIBRARY_LOAD: i32 = 3;

    /// Reported by an invocation whose argument could not be converted to the
    /// native representation. Matches the tool's "failed init" status.
    pub const CONVERSION_FAILED: i32 = 2;

    /// Reported by an invocation whose argument vector could not be allocated.
    /// Matches the tool's "out of memory" status.
    pub const CONVERSION_OUT_OF_MEMORY: i32 = 27;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(codes::SUCCESS, 0);
        assert_eq!(codes::INTERNAL, 1);
        assert_eq!(codes::CLI_ARGS, 2);
        assert_eq!(codes::LIBRARY_LOAD, 3);
        assert_eq!(codes::CONVERSION_FAILED, 2);
        assert_eq!(codes::CONVERSION_OUT_OF_MEMORY, 27);
    }

    #[test]
    fn test_exit_code_round_trip_through_i32() {
        let code = ExitCode::from(22);
        assert_eq!(i32::from(code), 22);
        assert!(!code.is_success());
        assert!(ExitCode::SUCCESS.is_success());
    }

    #[test]
    fn test_exit_code_display() {
        assert_eq!(ExitCode::LIBRARY_LOAD.to_string(), "3");
    }
}
