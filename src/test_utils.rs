//! Test utilities
//!
//! `ScriptedJobService` is an in-memory job provider whose answers are queued
//! up front, so controller behavior can be exercised without a network.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::domain::{JobRequest, StatusReport, TaskHandle, TaskResult, TaskStatus};
use crate::infrastructure::job_service::JobService;
use crate::infrastructure::service_error::{JobServiceError, JobServiceResult};

/// One queued status answer, optionally delivered late
#[derive(Debug, Clone)]
pub struct ScriptedStatus {
    pub outcome: JobServiceResult<StatusReport>,
    pub delay: Duration,
}

impl ScriptedStatus {
    #[must_use]
    pub fn status(status: TaskStatus) -> Self {
        Self {
            outcome: Ok(StatusReport {
                status,
                result: None,
            }),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn with_result(status: TaskStatus, result: TaskResult) -> Self {
        Self {
            outcome: Ok(StatusReport {
                status,
                result: Some(result),
            }),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn failure(error: JobServiceError) -> Self {
        Self {
            outcome: Err(error),
            delay: Duration::ZERO,
        }
    }

    #[must_use]
    pub const fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Default)]
struct Script {
    creates: VecDeque<JobServiceResult<TaskHandle>>,
    statuses: HashMap<TaskHandle, VecDeque<ScriptedStatus>>,
    submitted: Vec<JobRequest>,
    status_reads: Vec<TaskHandle>,
    downloads: HashMap<String, Vec<u8>>,
}

/// Job provider driven entirely by queued answers.
///
/// Status queues keep replaying their last entry once drained, which mirrors
/// a service that keeps reporting the same state.
pub struct ScriptedJobService {
    script: Mutex<Script>,
    base_url: Url,
}

impl Default for ScriptedJobService {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedJobService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            base_url: Url::parse("http://scripted.local/").expect("static URL parses"),
        }
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue the answer to the next `create_job`
    pub fn push_create(&self, outcome: JobServiceResult<TaskHandle>) -> &Self {
        self.script().creates.push_back(outcome);
        self
    }

    /// Queue a successful creation returning `task_id`
    pub fn accept(&self, task_id: &str) -> &Self {
        self.push_create(Ok(TaskHandle::new(task_id)))
    }

    /// Queue a status answer for `task_id`
    pub fn push_status(&self, task_id: &str, status: ScriptedStatus) -> &Self {
        self.script()
            .statuses
            .entry(TaskHandle::new(task_id))
            .or_default()
            .push_back(status);
        self
    }

    pub fn put_download(&self, link: &str, body: &[u8]) -> &Self {
        self.script().downloads.insert(link.to_string(), body.to_vec());
        self
    }

    /// Requests received by `create_job`, in order
    #[must_use]
    pub fn submitted(&self) -> Vec<JobRequest> {
        self.script().submitted.clone()
    }

    /// Number of status reads issued for `task_id`
    #[must_use]
    pub fn status_reads(&self, task_id: &str) -> usize {
        self.script()
            .status_reads
            .iter()
            .filter(|handle| handle.as_str() == task_id)
            .count()
    }

    fn next_status(&self, handle: &TaskHandle) -> Option<ScriptedStatus> {
        let mut script = self.script();
        script.status_reads.push(handle.clone());
        let queue = script.statuses.get_mut(handle)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl JobService for ScriptedJobService {
    async fn create_job(&self, request: &JobRequest) -> JobServiceResult<TaskHandle> {
        let mut script = self.script();
        script.submitted.push(request.clone());
        script.creates.pop_front().unwrap_or_else(|| {
            Err(JobServiceError::Transport {
                url: "scripted://create".to_string(),
                message: "no scripted create answer".to_string(),
            })
        })
    }

    async fn read_status(&self, handle: &TaskHandle) -> JobServiceResult<StatusReport> {
        let Some(scripted) = self.next_status(handle) else {
            return Err(JobServiceError::HttpStatus {
                status: 404,
                url: format!("scripted://task/{handle}"),
            });
        };
        if !scripted.delay.is_zero() {
            tokio::time::sleep(scripted.delay).await;
        }
        scripted.outcome
    }

    async fn health(&self) -> JobServiceResult<bool> {
        Ok(true)
    }

    async fn download(&self, link: &str) -> JobServiceResult<Vec<u8>> {
        self.script()
            .downloads
            .get(link)
            .cloned()
            .ok_or_else(|| JobServiceError::HttpStatus {
                status: 404,
                url: link.to_string(),
            })
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}
