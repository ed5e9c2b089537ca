//! HTTP client for the DevHelm task endpoint
//!
//! `GET {base_url}/v1/task`, authenticated with `X-API-KEY`. Response
//! interpretation lives in [`interpret_response`] so each branch can be
//! tested without a server.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};

use super::source::{TaskRequestError, TaskSource};
use super::types::{Task, TaskResponse, TaskStatus};

/// Path of the task endpoint relative to the base URL
pub const TASK_PATH: &str = "/v1/task";

/// Header carrying the agent's API key
pub const API_KEY_HEADER: &str = "X-API-KEY";

/// Task API client
pub struct TaskRequester {
    client: Client,
    base_url: String,
    api_key: String,
}

impl TaskRequester {
    /// Create a client using the transport's default timeout
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, TaskRequestError> {
        Self::with_timeout(base_url, api_key, None)
    }

    /// Create a client with an explicit request timeout
    pub fn with_timeout(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, TaskRequestError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, base_url, api_key))
    }

    /// Use a preconfigured reqwest client
    pub fn with_client(client: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn task_url(&self) -> String {
        format!("{}{}", self.base_url, TASK_PATH)
    }
}

#[async_trait]
impl TaskSource for TaskRequester {
    async fn request_task(&self) -> Result<TaskResponse, TaskRequestError> {
        let url = self.task_url();
        log::trace!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.bytes().await?;
        log::trace!("{} answered {} ({} bytes)", url, status, body.len());

        interpret_response(status, &body)
    }
}

impl fmt::Debug for TaskRequester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequester")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Map a status code and body onto a task outcome.
///
/// 200 must carry `id`, `ticket_id` and `prompt` as strings; 204 is
/// `NoTask`; 409 is `Busy`; anything else is an error.
pub fn interpret_response(status: u16, body: &[u8]) -> Result<TaskResponse, TaskRequestError> {
    match status {
        200 => parse_task(body).map(TaskResponse::Assigned),
        204 => Ok(TaskResponse::Status(TaskStatus::NoTask)),
        409 => Ok(TaskResponse::Status(TaskStatus::Busy)),
        _ => Err(TaskRequestError::Server {
            status,
            message: error_message(status, body),
        }),
    }
}

fn parse_task(body: &[u8]) -> Result<Task, TaskRequestError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| TaskRequestError::InvalidJson(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| TaskRequestError::InvalidPayload("expected JSON object".to_string()))?;

    Ok(Task {
        id: required_string(object, "id")?,
        ticket_id: required_string(object, "ticket_id")?,
        prompt: required_string(object, "prompt")?,
    })
}

fn required_string(object: &Map<String, Value>, field: &'static str) -> Result<String, TaskRequestError> {
    match object.get(field) {
        None => Err(TaskRequestError::MissingField(field)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(TaskRequestError::InvalidField(field)),
    }
}

fn error_message(status: u16, body: &[u8]) -> String {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| format!("HTTP {}", status))
}
