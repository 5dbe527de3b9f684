//! Error types for argument conversion

use inproc_utils::exit_codes::codes;
use thiserror::Error;

/// Why a native argument vector could not be built.
///
/// `index` is the position in the native vector: `0` is the synthetic program
/// name, `1..` are the host's arguments in order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("Out of memory while converting argument {index}")]
    OutOfMemory { index: usize },

    #[error("No conversion stage could encode argument {index} (tried: {})", .attempted.join(", "))]
    EncodingFailure {
        index: usize,
        attempted: Vec<&'static str>,
    },

    #[error("Argument {index} contains a NUL byte at offset {offset}")]
    InteriorNul { index: usize, offset: usize },
}

impl ConversionError {
    /// Position in the native vector of the argument that failed.
    #[must_use]
    pub const fn index(&self) -> usize {
        match self {
            Self::OutOfMemory { index }
            | Self::EncodingFailure { index, .. }
            | Self::InteriorNul { index, .. } => *index,
        }
    }

    /// Exit code an invocation reports when it is cut short by this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::OutOfMemory { .. } => codes::CONVERSION_OUT_OF_MEMORY,
            Self::EncodingFailure { .. } | Self::InteriorNul { .. } => codes::CONVERSION_FAILED,
        }
    }
}
