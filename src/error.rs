//! Error types for the schema registry

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Malformed SDL. The only failure that aborts processing of a document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("syntax error at {line}:{column}: {message}")]
pub struct SyntaxError {
    /// 1-based line of the offending token
    pub line: usize,
    /// 1-based column of the offending token
    pub column: usize,
    pub message: String,
}

impl SyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }
}

/// Schema registry errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),

    #[error("Protocol not registered: {0}")]
    NotFound(String),

    #[error("Invalid private field pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config_crate::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}
