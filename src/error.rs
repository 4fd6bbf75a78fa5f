/*!
 * Error types for w3stat
 *
 * Only setup failures live here. Per-item failures (unparsable identifiers,
 * backend errors) are data and travel inside the aggregated record instead.
 */

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, StatError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum StatError {
    /// Invalid or unreadable configuration
    Config(String),

    /// A required environment variable is unset or empty
    MissingEnv(String),

    /// I/O error (stdout, config file, log file)
    Io(io::Error),

    /// Async runtime or client construction failed
    Runtime(String),
}

impl StatError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            StatError::Config(_)
            | StatError::MissingEnv(_)
            | StatError::Io(_)
            | StatError::Runtime(_) => EXIT_FATAL,
        }
    }
}

impl fmt::Display for StatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatError::Config(msg) => {
                write!(f, "Configuration error: {}", msg)
            }
            StatError::MissingEnv(key) => {
                write!(f, "{} must be set in ENV", key)
            }
            StatError::Io(err) => {
                write!(f, "I/O error: {}", err)
            }
            StatError::Runtime(msg) => {
                write!(f, "Runtime error: {}", msg)
            }
        }
    }
}

impl std::error::Error for StatError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StatError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for StatError {
    fn from(err: io::Error) -> Self {
        StatError::Io(err)
    }
}

impl From<toml::de::Error> for StatError {
    fn from(err: toml::de::Error) -> Self {
        StatError::Config(format!("Invalid config file: {}", err))
    }
}

impl From<serde_json::Error> for StatError {
    fn from(err: serde_json::Error) -> Self {
        StatError::Io(io::Error::new(io::ErrorKind::InvalidData, err))
    }
}
