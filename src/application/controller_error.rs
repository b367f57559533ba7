//! Failures surfaced by the task controller

use thiserror::Error;

use crate::domain::TaskHandle;
use crate::infrastructure::service_error::JobServiceError;

#[derive(Error, Debug, Clone)]
pub enum ControllerError {
    #[error("Invalid job request: {field} {reason}")]
    InvalidRequest { field: &'static str, reason: String },

    #[error("Task {0} is not the active task")]
    InactiveHandle(TaskHandle),

    #[error("No task has been submitted")]
    NoActiveTask,

    #[error("Task {0} has no downloadable result")]
    ResultUnavailable(TaskHandle),

    #[error("Failed to write result file: {0}")]
    Io(String),

    #[error(transparent)]
    Service(#[from] JobServiceError),
}

impl ControllerError {
    /// Whether the failure came from the remote service rather than the caller
    #[must_use]
    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::Service(_))
    }
}

impl From<std::io::Error> for ControllerError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type ControllerResult<T> = Result<T, ControllerError>;
