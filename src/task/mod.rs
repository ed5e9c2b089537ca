//! Task client - fetches assignments from the DevHelm API
//!
//! This module provides:
//! - Task and status types
//! - TaskSource trait for the control loop
//! - TaskRequester reqwest implementation
//! - MockTaskSource for tests

pub mod requester;
pub mod source;
pub mod types;

pub use requester::{API_KEY_HEADER, TASK_PATH, TaskRequester, interpret_response};
pub use source::{MockTaskSource, TaskRequestError, TaskSource};
pub use types::{Task, TaskResponse, TaskStatus};
