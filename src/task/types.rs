//! Task types returned by the DevHelm task API

use serde::{Deserialize, Serialize};
use std::fmt;

/// A task assignment from DevHelm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Opaque task identifier (UUID on the server side)
    pub id: String,
    /// Ticket reference, e.g. "DH-123"
    pub ticket_id: String,
    /// Instructions handed to the assistant verbatim
    pub prompt: String,
}

impl Task {
    pub fn new(id: impl Into<String>, ticket_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ticket_id: ticket_id.into(),
            prompt: prompt.into(),
        }
    }
}

/// Non-task outcomes of a fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// A task is already in progress server-side (HTTP 409)
    Busy,
    /// Nothing to do (HTTP 204)
    NoTask,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Busy => write!(f, "busy"),
            TaskStatus::NoTask => write!(f, "none"),
        }
    }
}

/// Exactly one of {Task, Busy, NoTask}
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskResponse {
    Assigned(Task),
    Status(TaskStatus),
}

impl TaskResponse {
    pub fn busy() -> Self {
        TaskResponse::Status(TaskStatus::Busy)
    }

    pub fn no_task() -> Self {
        TaskResponse::Status(TaskStatus::NoTask)
    }

    pub fn task(&self) -> Option<&Task> {
        match self {
            TaskResponse::Assigned(task) => Some(task),
            TaskResponse::Status(_) => None,
        }
    }
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        TaskResponse::Assigned(task)
    }
}
