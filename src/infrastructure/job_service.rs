//! The remote job service seen through its two job operations (plus the
//! health probe and result download the service also exposes).

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use crate::domain::{JobRequest, StatusReport, TaskHandle};
use crate::infrastructure::config::ServiceConfig;
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::service_error::{JobServiceError, JobServiceResult};
use crate::infrastructure::wire::{CreateJobBody, CreateJobReply, HealthReply, TaskStatusReply};

/// Operations the controller needs from a job provider
#[async_trait]
pub trait JobService: Send + Sync {
    /// Create a job and return its handle
    async fn create_job(&self, request: &JobRequest) -> JobServiceResult<TaskHandle>;

    /// Read the current status of a job
    async fn read_status(&self, handle: &TaskHandle) -> JobServiceResult<StatusReport>;

    /// Whether the provider reports itself healthy
    async fn health(&self) -> JobServiceResult<bool>;

    /// Fetch a finished job's result file
    async fn download(&self, link: &str) -> JobServiceResult<Vec<u8>>;

    /// Base URL relative links in results are resolved against
    fn base_url(&self) -> &Url;
}

/// `JobService` over HTTP/JSON
pub struct HttpJobService {
    http: HttpClient,
    base_url: Url,
    submit_path: String,
    status_path: String,
    health_path: String,
}

impl HttpJobService {
    pub fn new(config: &ServiceConfig) -> JobServiceResult<Self> {
        let mut base_url = Url::parse(&config.base_url).map_err(|e| JobServiceError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        // endpoint paths are joined below any path prefix of the base
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http: HttpClient::new(config)?,
            base_url,
            submit_path: config.submit_path.clone(),
            status_path: config.status_path.clone(),
            health_path: config.health_path.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> JobServiceResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| JobServiceError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: e.to_string(),
            })
    }

    /// Status endpoint for `handle`; the id is percent-encoded as one segment
    fn status_endpoint(&self, handle: &TaskHandle) -> JobServiceResult<Url> {
        let (prefix, suffix) = self
            .status_path
            .split_once("{task_id}")
            .unwrap_or((self.status_path.as_str(), ""));
        let mut url = self.endpoint(prefix.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|()| JobServiceError::InvalidUrl {
                url: self.base_url.to_string(),
                reason: "base URL cannot carry a path".to_string(),
            })?
            .push(handle.as_str());
        if !suffix.is_empty() {
            let path = format!("{}{}", url.path(), suffix);
            url.set_path(&path);
        }
        Ok(url)
    }
}

#[async_trait]
impl JobService for HttpJobService {
    async fn create_job(&self, request: &JobRequest) -> JobServiceResult<TaskHandle> {
        let url = self.endpoint(&self.submit_path)?;
        let reply: CreateJobReply = self
            .http
            .post_json(url.as_str(), &CreateJobBody::from(request))
            .await?;

        if reply.task_id.trim().is_empty() {
            return Err(JobServiceError::malformed(url.as_str(), "empty task_id"));
        }
        info!(
            "Job service accepted {} as {} ({})",
            request.url,
            reply.task_id,
            reply.message.as_deref().unwrap_or("no message")
        );
        Ok(reply.handle())
    }

    async fn read_status(&self, handle: &TaskHandle) -> JobServiceResult<StatusReport> {
        let url = self.status_endpoint(handle)?;
        let reply: TaskStatusReply = self.http.get_json(url.as_str()).await?;
        debug!("Task {} reported {}", handle, reply.status);
        Ok(reply.into())
    }

    async fn health(&self) -> JobServiceResult<bool> {
        let url = self.endpoint(&self.health_path)?;
        let reply: HealthReply = self.http.get_json(url.as_str()).await?;
        Ok(reply.status.eq_ignore_ascii_case("healthy"))
    }

    async fn download(&self, link: &str) -> JobServiceResult<Vec<u8>> {
        let url = Url::parse(link)
            .or_else(|_| self.base_url.join(link))
            .map_err(|e| JobServiceError::InvalidUrl {
                url: link.to_string(),
                reason: e.to_string(),
            })?;
        self.http.get_bytes(url.as_str()).await
    }

    fn base_url(&self) -> &Url {
        &self.base_url
    }
}
