//! Error types for wintts

use std::io;
use thiserror::Error;

/// Main error type for wintts
#[derive(Error, Debug)]
pub enum WinttsError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Spawn error: {0}")]
    Spawn(String),

    #[error("Termination error: {0}")]
    Termination(String),

    #[error("Voice enumeration error: {0}")]
    Enumeration(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for wintts operations
pub type Result<T> = std::result::Result<T, WinttsError>;

impl From<String> for WinttsError {
    fn from(s: String) -> Self {
        WinttsError::Other(s)
    }
}

impl From<&str> for WinttsError {
    fn from(s: &str) -> Self {
        WinttsError::Other(s.to_string())
    }
}
