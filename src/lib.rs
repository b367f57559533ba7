//! Crawl Task Tracker
//!
//! Client-side controller for a remote web-crawl service: submits a crawl
//! job, polls its status every two seconds until it completes or fails, and
//! exposes the current state to whatever presentation layer sits on top.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod test_utils;

pub use application::{ControllerError, TaskController};
pub use domain::{JobOptions, JobRequest, StatusReport, TaskHandle, TaskResult, TaskSnapshot, TaskStatus};
pub use infrastructure::{JobService, TrackerConfig};
