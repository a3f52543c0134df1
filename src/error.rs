//! # Error Types
//!
//! Custom error types for RC Link using `thiserror`.
//!
//! Malformed input frames are deliberately *not* errors: decoders recover
//! locally by discarding and resynchronizing, and link loss is surfaced as
//! supervisor state rather than as an error value. The only fatal category
//! is construction-time misconfiguration, which indicates a build/config
//! defect and must abort startup.

use thiserror::Error;

/// Main error type for RC Link
#[derive(Debug, Error)]
pub enum RcLinkError {
    /// Construction-time misconfiguration (invalid channel map, zero channel count)
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file parse errors
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for RC Link
pub type Result<T> = std::result::Result<T, RcLinkError>;
