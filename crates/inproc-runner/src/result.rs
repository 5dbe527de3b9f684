//! Invocation result record

use inproc_argv::ConversionError;
use serde::{Serialize, Serializer};

/// Outcome of one in-process invocation.
///
/// `stdout` and `stderr` hold exactly the bytes the tool wrote, which need
/// not be valid UTF-8. Serialising renders them lossily as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationResult {
    /// The entry point's return value, or the conversion failure's code when
    /// the entry point never ran
    pub exit_code: i32,
    /// Captured standard output
    #[serde(serialize_with = "lossy")]
    pub stdout: Vec<u8>,
    /// Captured standard error
    #[serde(serialize_with = "lossy")]
    pub stderr: Vec<u8>,
    /// Bytes the stdout buffer could not hold and dropped
    pub stdout_dropped_bytes: usize,
    /// Bytes the stderr buffer could not hold and dropped
    pub stderr_dropped_bytes: usize,
    /// Set when the argument vector could not be built
    #[serde(serialize_with = "error_message")]
    pub conversion_error: Option<ConversionError>,
}

fn lossy<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(bytes))
}

fn error_message<S: Serializer>(
    error: &Option<ConversionError>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(error) => serializer.serialize_some(&error.to_string()),
        None => serializer.serialize_none(),
    }
}

impl InvocationResult {
    /// A result for an entry point that ran and returned `exit_code`.
    #[must_use]
    pub fn new(exit_code: i32, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code,
            stdout,
            stderr,
            stdout_dropped_bytes: 0,
            stderr_dropped_bytes: 0,
            conversion_error: None,
        }
    }

    /// A result for an invocation cut short before the entry point ran.
    #[must_use]
    pub fn from_conversion_error(error: ConversionError, stdout: Vec<u8>, stderr: Vec<u8>) -> Self {
        Self {
            exit_code: error.exit_code(),
            conversion_error: Some(error),
            ..Self::new(0, stdout, stderr)
        }
    }

    /// Get stdout as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a UTF-8 string, lossy conversion.
    #[must_use]
    pub fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the tool ran and returned 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0 && self.conversion_error.is_none()
    }

    /// Whether either capture buffer dropped output.
    #[must_use]
    pub fn output_truncated(&self) -> bool {
        self.stdout_dropped_bytes > 0 || self.stderr_dropped_bytes > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_new() {
        let result = InvocationResult::new(0, b"OK\n".to_vec(), Vec::new());
        assert!(result.success());
        assert!(!result.output_truncated());
        assert_eq!(result.stdout_string(), "OK\n");
        assert_eq!(result.stderr_string(), "");
    }

    #[test]
    fn test_result_nonzero_exit_is_not_success() {
        let result = InvocationResult::new(22, Vec::new(), Vec::new());
        assert!(!result.success());
        assert_eq!(result.exit_code, 22);
    }

    #[test]
    fn test_result_from_conversion_error() {
        let result = InvocationResult::from_conversion_error(
            ConversionError::OutOfMemory { index: 1 },
            Vec::new(),
            Vec::new(),
        );
        assert_eq!(result.exit_code, 27);
        assert!(!result.success());
        assert_eq!(
            result.conversion_error,
            Some(ConversionError::OutOfMemory { index: 1 })
        );
    }

    #[test]
    fn test_result_truncation_flag() {
        let mut result = InvocationResult::new(0, Vec::new(), Vec::new());
        result.stderr_dropped_bytes = 10;
        assert!(result.output_truncated());
        assert!(result.success());
    }

    #[test]
    fn test_result_serializes_bytes_lossily() {
        let result = InvocationResult::new(3, vec![b'h', b'i', 0xFF], b"warn".to_vec());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["exit_code"], 3);
        assert_eq!(json["stdout"], "hi\u{FFFD}");
        assert_eq!(json["stderr"], "warn");
        assert!(json["conversion_error"].is_null());

        let result = InvocationResult::from_conversion_error(
            ConversionError::InteriorNul { index: 1, offset: 0 },
            Vec::new(),
            Vec::new(),
        );
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(
            json["conversion_error"],
            "Argument 1 contains a NUL byte at offset 0"
        );
    }
}
