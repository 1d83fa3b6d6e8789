//! Core error types.

use crate::protocol::ProtocolViolation;

/// Recoverable conditions raised by boundary primitives.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Element access outside `[0, length)`.
    #[error("index {index} out of range for view of length {length}")]
    IndexOutOfRange { index: u64, length: u64 },

    /// A null pointer was paired with a non-zero length.
    #[error("null pointer given for a view of length {length}")]
    NullView { length: u64 },

    /// Bytes handed to a string constructor were not valid UTF-8.
    #[error("invalid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// A NUL-terminated string was requested for text containing NUL.
    #[error("string contains an interior NUL at byte {position}")]
    InteriorNul { position: usize },

    /// An envelope was unwrapped as the variant it does not hold.
    #[error("unwrap failed: {detail}")]
    Unwrap { detail: String },

    /// A protocol violation surfaced as a value (see [`crate::protocol`]).
    #[error("protocol violation: {0}")]
    Protocol(#[from] ProtocolViolation),

    /// Invalid configuration value.
    #[error("invalid configuration: {detail}")]
    Config { detail: String },

    /// A measurement was requested before the baseline was calibrated.
    #[error("measurement requested before calibration")]
    NotCalibrated,

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
