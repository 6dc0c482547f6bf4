/// Querylog Error Module
///
/// This module defines the error type shared by the level parser, the
/// configuration layer and the demo binary. Dispatching a message never
/// fails; formatting problems are embedded in the output instead.
use thiserror::Error;

/// Error type for the querylog crate.
///
/// Covers:
/// - Unknown severity level names (environment, config, CLI)
/// - Configuration loading and validation
/// - File system access for config files
/// - Database errors surfaced by the demo binary
#[derive(Error, Debug)]
pub enum QueryLogError {
    /// A level name that does not match any known severity
    #[error("Invalid log level: {0:?}")]
    InvalidLevel(String),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML parse errors from configuration files
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File system and I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Database-related errors from SQLite operations
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Type alias for Result to use QueryLogError as the error type.
pub type Result<T> = std::result::Result<T, QueryLogError>;
