//! Error types for calls against the remote job service
//!
//! Transport failures and malformed bodies are distinct variants for
//! logging, but callers treat them the same way.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum JobServiceError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Job service returned HTTP {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Invalid service URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

impl JobServiceError {
    pub(crate) fn transport(url: &str, err: &reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::MalformedResponse {
                url: url.to_string(),
                reason: err.to_string(),
            };
        }
        Self::Transport {
            url: url.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl ToString) -> Self {
        Self::MalformedResponse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the next poll tick may reasonably succeed
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::MalformedResponse { .. } => true,
            Self::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidUrl { .. } | Self::ClientBuild(_) => false,
        }
    }

    /// HTTP status code, when the service answered at all
    #[must_use]
    pub const fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type JobServiceResult<T> = Result<T, JobServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        let err = JobServiceError::HttpStatus {
            status: 503,
            url: "http://localhost:8000/api/task/abc".into(),
        };
        assert!(err.is_transient());
        assert_eq!(err.status_code(), Some(503));
    }

    #[test]
    fn missing_task_is_not_transient() {
        let err = JobServiceError::HttpStatus {
            status: 404,
            url: "http://localhost:8000/api/task/abc".into(),
        };
        assert!(!err.is_transient());
        assert_eq!(
            err.to_string(),
            "Job service returned HTTP 404 for http://localhost:8000/api/task/abc"
        );
    }

    #[test]
    fn malformed_body_counts_as_transient() {
        let err = JobServiceError::malformed("http://localhost:8000/api/task/abc", "expected value");
        assert!(err.is_transient());
        assert!(err.status_code().is_none());
    }
}
