//! JSON bodies exchanged with the job service.
//!
//! Field names here are the service's snake_case names; the rest of the
//! crate only sees the domain types.

use serde::{Deserialize, Serialize};

use crate::domain::{JobRequest, StatusReport, TaskHandle, TaskResult, TaskStatus};

/// Body of `POST /api/scrape/website`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateJobBody {
    pub url: String,
    pub max_pages: u32,
    pub max_workers: u32,
    pub include_subdomains: bool,
}

impl From<&JobRequest> for CreateJobBody {
    fn from(request: &JobRequest) -> Self {
        Self {
            url: request.url.clone(),
            max_pages: request.max_pages,
            max_workers: request.max_workers,
            include_subdomains: request.include_subdomains,
        }
    }
}

/// Answer to a job creation. Only `task_id` is required.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateJobReply {
    pub task_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Answer to `GET /api/task/{task_id}`. Extra bookkeeping fields the service
/// adds (`created_at`, `type`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskStatusReply {
    pub status: String,
    #[serde(default)]
    pub result: Option<WireTaskResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WireTaskResult {
    #[serde(default)]
    pub pages_scraped: u64,
    #[serde(default)]
    pub download_url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Answer to `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthReply {
    pub status: String,
}

impl CreateJobReply {
    #[must_use]
    pub fn handle(&self) -> TaskHandle {
        TaskHandle::new(self.task_id.clone())
    }
}

impl From<WireTaskResult> for TaskResult {
    fn from(wire: WireTaskResult) -> Self {
        Self {
            pages_scraped: wire.pages_scraped,
            download_url: wire.download_url,
            failure: wire.error,
        }
    }
}

impl From<TaskStatusReply> for StatusReport {
    fn from(reply: TaskStatusReply) -> Self {
        Self {
            status: TaskStatus::from(reply.status),
            result: reply.result.map(TaskResult::from),
        }
    }
}
