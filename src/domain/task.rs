//! # Task tracking types
//!
//! Handle, status, result and the observable snapshot of the single job a
//! controller tracks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Opaque job identifier issued by the remote service
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskHandle(String);

impl TaskHandle {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job status as reported by the remote service.
///
/// Only `Completed` and `Failed` are terminal. Intermediate tags the
/// provider defines on its own (e.g. `SCRAPING`) are carried in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Other(String),
}

impl TaskStatus {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    #[must_use]
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Other(tag) => tag,
        }
    }
}

impl FromStr for TaskStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        Ok(match tag.to_ascii_uppercase().as_str() {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Other(tag.to_string()),
        })
    }
}

impl From<String> for TaskStatus {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        match status {
            TaskStatus::Other(tag) => tag,
            known => known.as_tag().to_string(),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}

/// Payload attached by the service once a job finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub pages_scraped: u64,
    pub download_url: Option<String>,
    /// Failure text the service attaches to a `FAILED` job
    pub failure: Option<String>,
}

impl TaskResult {
    /// Joins a service-relative download link (`/downloads/...`) onto `base`.
    /// Absolute links are returned unchanged.
    #[must_use]
    pub fn resolve_download_url(&self, base: &Url) -> Option<Url> {
        let link = self.download_url.as_deref()?;
        Url::parse(link).or_else(|_| base.join(link)).ok()
    }
}

/// What a single status read returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: TaskStatus,
    pub result: Option<TaskResult>,
}

/// Observable state of a controller.
///
/// `generation` moves forward on every successful submit and on reset, so an
/// observer can tell a fresh job apart from the previous one even if the
/// service happens to reuse an identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub generation: u64,
    pub handle: Option<TaskHandle>,
    pub status: Option<TaskStatus>,
    pub result: Option<TaskResult>,
    pub error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl TaskSnapshot {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.as_ref().is_some_and(TaskStatus::is_terminal)
    }

    /// True when `handle` is the job this snapshot currently tracks
    #[must_use]
    pub fn tracks(&self, handle: &TaskHandle) -> bool {
        self.handle.as_ref() == Some(handle)
    }
}
