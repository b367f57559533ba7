//! Application layer module
//!
//! Drives the lifecycle of a submitted job on top of the infrastructure's
//! job service.

pub mod controller_error;
pub mod task_controller;

pub use controller_error::{ControllerError, ControllerResult};
pub use task_controller::TaskController;
