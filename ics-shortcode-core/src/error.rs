//! Error types for calendar shortcodes.

use thiserror::Error;

/// Errors that can occur while storing or serving calendar events.
///
/// Invalid shortcode input is not an error: it renders as an inline warning
/// (see [`crate::renderer::ShortcodeWarning`]).
#[derive(Error, Debug)]
pub enum ShortcodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid table prefix '{0}': only ASCII letters, digits and '_' are allowed")]
    InvalidTablePrefix(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported options schema version {0}")]
    UnsupportedSchema(u32),

    #[error("Date '{0}' could not be parsed")]
    InvalidDate(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for shortcode operations.
pub type ShortcodeResult<T> = Result<T, ShortcodeError>;
