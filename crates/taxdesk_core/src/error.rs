use thiserror::Error;

use crate::JobId;

/// Rejected configuration. Raised synchronously, before any timer exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("job id must not be empty")]
    EmptyJobId,
    #[error("poll interval must be greater than zero")]
    ZeroInterval,
    #[error("max attempts must be at least 1")]
    ZeroAttempts,
    #[error("chars per tick must be at least 1")]
    ZeroCharsPerTick,
    #[error("reveal tick must be greater than zero")]
    ZeroTick,
}

/// Why a watch session ended in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    /// The backend answered but had no resource for the id.
    #[error("resource not found")]
    NotFound,
    /// The fetch itself failed (network, auth, server error).
    #[error("fetch failed: {message}")]
    Fetch { message: String },
    /// The backend answered with a different resource than the one watched.
    #[error("asked for {expected}, backend returned {found}")]
    UnexpectedId { expected: JobId, found: JobId },
}

impl WatchError {
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::Fetch {
            message: message.into(),
        }
    }
}
