//! Error types for backend lookups

use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for backend lookups
pub type BackendResult<T> = Result<T, BackendError>;

/// The backing store a lookup was issued against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Backend {
    Denylist,
    Dudewhere,
    Index,
}

impl Backend {
    /// Key used for this backend in structured output
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Denylist => "denylist",
            Backend::Dudewhere => "dudewhere",
            Backend::Index => "dynamo",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during a single backend call.
///
/// An absent answer (404, empty listing, zero rows) is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Network or SDK dispatch failure
    #[error("{backend} transport error: {message}")]
    Transport { backend: Backend, message: String },

    /// The service answered with something other than present/absent
    #[error("{backend} unexpected response ({status}): {body}")]
    UnexpectedResponse {
        backend: Backend,
        status: String,
        body: String,
    },

    /// The service answered but the payload could not be decoded
    #[error("{backend} malformed response: {message}")]
    Malformed { backend: Backend, message: String },

    /// The call did not finish within the per-call timeout
    #[error("{backend} call timed out after {after:?}")]
    Timeout { backend: Backend, after: Duration },
}

impl BackendError {
    pub fn transport(backend: Backend, message: impl Into<String>) -> Self {
        BackendError::Transport {
            backend,
            message: message.into(),
        }
    }

    pub fn malformed(backend: Backend, message: impl Into<String>) -> Self {
        BackendError::Malformed {
            backend,
            message: message.into(),
        }
    }

    /// The backend this error came from
    pub fn backend(&self) -> Backend {
        match self {
            BackendError::Transport { backend, .. }
            | BackendError::UnexpectedResponse { backend, .. }
            | BackendError::Malformed { backend, .. }
            | BackendError::Timeout { backend, .. } => *backend,
        }
    }
}
