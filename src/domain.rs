//! Domain module - the values a crawl job is described and tracked by
//!
//! - `job_request`: what gets submitted
//! - `task`: handle, status, result and the observable snapshot

pub mod job_request;
pub mod task;

// Re-export commonly used items for convenience
pub use job_request::{JobOptions, JobRequest};
pub use task::{StatusReport, TaskHandle, TaskResult, TaskSnapshot, TaskStatus};
