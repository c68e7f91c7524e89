use std::fmt;

use chrono::{DateTime, Utc};

use crate::ConfigError;

/// Opaque, non-empty identifier of a backend job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ConfigError> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ConfigError::EmptyJobId);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A polled backend resource. `result` stays `None` while the job runs and,
/// once set, never goes back to `None` for the same id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResource<T> {
    pub id: JobId,
    pub result: Option<T>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> JobResource<T> {
    pub fn pending(id: JobId) -> Self {
        Self {
            id,
            result: None,
            created_at: None,
            updated_at: None,
        }
    }

    pub fn resolved(id: JobId, result: T) -> Self {
        Self {
            id,
            result: Some(result),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn with_timestamps(
        mut self,
        created_at: Option<DateTime<Utc>>,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.created_at = created_at;
        self.updated_at = updated_at;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.result.is_some()
    }
}

/// The payload of a finished chat job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatAnswer {
    pub text: String,
}

impl ChatAnswer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
