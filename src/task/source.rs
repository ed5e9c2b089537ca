//! Task source trait, its error type and a scripted mock

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use super::types::TaskResponse;

/// Anything the control loop can ask for the next task
#[async_trait]
pub trait TaskSource: Send + Sync {
    /// One fetch, no retries. Retry policy belongs to the caller.
    async fn request_task(&self) -> Result<TaskResponse, TaskRequestError>;
}

/// Errors from the task API
#[derive(Debug, thiserror::Error)]
pub enum TaskRequestError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Invalid response format: {0}")]
    InvalidPayload(String),

    #[error("Missing required field in response: {0}")]
    MissingField(&'static str),

    #[error("Invalid response: '{0}' must be a string")]
    InvalidField(&'static str),

    #[error("Server returned error {status}: {message}")]
    Server { status: u16, message: String },
}

impl TaskRequestError {
    /// Malformed or unexpected response, as opposed to a network failure
    pub fn is_protocol(&self) -> bool {
        !matches!(self, TaskRequestError::Transport(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            TaskRequestError::Server { status, .. } => Some(*status),
            TaskRequestError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Scripted task source for tests.
///
/// Responses are handed out in order; once the script runs dry every call
/// answers `NoTask`.
#[derive(Debug, Default)]
pub struct MockTaskSource {
    script: Mutex<VecDeque<Result<TaskResponse, TaskRequestError>>>,
    calls: Mutex<usize>,
}

impl MockTaskSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_responses(responses: impl IntoIterator<Item = TaskResponse>) -> Self {
        let source = Self::new();
        for response in responses {
            source.push(Ok(response));
        }
        source
    }

    pub fn push(&self, result: Result<TaskResponse, TaskRequestError>) {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).push_back(result);
    }

    pub fn push_response(&self, response: TaskResponse) {
        self.push(Ok(response));
    }

    pub fn push_error(&self, error: TaskRequestError) {
        self.push(Err(error));
    }

    /// Number of `request_task` calls served so far
    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl TaskSource for MockTaskSource {
    async fn request_task(&self) -> Result<TaskResponse, TaskRequestError> {
        *self.calls.lock().unwrap_or_else(|e| e.into_inner()) += 1;
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| Ok(TaskResponse::no_task()))
    }
}
