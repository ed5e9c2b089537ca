//! Error types for the DevHelm agent
//!
//! Each seam owns its own error enum; `AgentError` gathers them for callers
//! that just need to log and move on.

use thiserror::Error;

use crate::config::ConfigError;
use crate::screen::ScreenError;
use crate::task::TaskRequestError;
use crate::ui::UiError;

/// All error types that can surface from the agent
#[derive(Debug, Error)]
pub enum AgentError {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Task API transport or protocol failure
    #[error("Task request failed: {0}")]
    TaskRequest(#[from] TaskRequestError),

    /// UI bridge failure (missing template, injection error)
    #[error("UI error: {0}")]
    Ui(#[from] UiError),

    /// Screen capability failure outside the UI bridge
    #[error("Screen error: {0}")]
    Screen(#[from] ScreenError),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Logging(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;
