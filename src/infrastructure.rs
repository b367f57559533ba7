//! Infrastructure layer: configuration, logging and the HTTP binding to the
//! remote job service.

pub mod config; // Layered configuration loading
pub mod http_client; // Rate-limited JSON client
pub mod job_service;
pub mod logging;
pub mod service_error;
pub mod wire; // snake_case bodies of the job service

// Re-export commonly used items
pub use config::{ConfigError, TrackerConfig};
pub use job_service::{HttpJobService, JobService};
pub use logging::{init_logging, init_logging_with_config};
pub use service_error::{JobServiceError, JobServiceResult};
