//! Error types shared by the core circuit representation.

use thiserror::Error;

/// Result type alias using [`CoreError`].
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while building or stamping a circuit, independent of any
/// particular solver strategy.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    /// Duplicate element name, dangling node reference, or a zero/negative
    /// R, L, or C parameter.
    #[error("bad netlist: {message}")]
    BadNetlist { message: String },

    /// A matrix/vector operation was given mismatched dimensions.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

impl CoreError {
    pub fn bad_netlist(message: impl Into<String>) -> Self {
        Self::BadNetlist {
            message: message.into(),
        }
    }
}
