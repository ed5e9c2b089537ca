//! Session state and lifecycle types for the control loop

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::config::AgentConfig;
use crate::task::{Task, TaskRequestError, TaskStatus};

/// Timing and limits for the control loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopConfig {
    /// Fixed sleep between steps
    pub interval: Duration,
    /// More consecutive busy answers than this ends the run
    pub max_consecutive_continues: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_consecutive_continues: 5,
        }
    }
}

impl LoopConfig {
    pub fn new(interval: Duration, max_consecutive_continues: u32) -> Self {
        Self {
            interval,
            max_consecutive_continues,
        }
    }
}

impl From<&AgentConfig> for LoopConfig {
    fn from(config: &AgentConfig) -> Self {
        Self::new(config.poll_interval(), config.max_consecutive_continues)
    }
}

/// State owned by the control loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub current_task: Option<Task>,
    pub consecutive_continues: u32,
}

impl SessionState {
    /// A new task supersedes the old one and resets the counter
    pub fn accept_task(&mut self, task: Task) {
        self.current_task = Some(task);
        self.consecutive_continues = 0;
    }

    /// Count one more busy answer, returning the new count
    pub fn record_busy(&mut self) -> u32 {
        self.consecutive_continues = self.consecutive_continues.saturating_add(1);
        self.consecutive_continues
    }
}

/// Why a running loop stopped. Both are clean exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Interrupted,
    ContinueLimitReached,
}

impl Termination {
    pub fn exit_code(&self) -> u8 {
        0
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::Interrupted => write!(f, "interrupted"),
            Termination::ContinueLimitReached => write!(f, "continue limit reached"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitingInitialTask,
    Running,
    Terminated(Termination),
}

/// The loop could not get a task to start with
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("No initial task available: {0}")]
    NoTask(TaskStatus),

    #[error("Error fetching initial task: {0}")]
    Fetch(#[from] TaskRequestError),
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

/// What one iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Readiness indicator absent, nothing fetched
    NotReady,
    NewTask { delivered: bool },
    Continued { count: u32, delivered: bool },
    NoTask,
    /// Fetch failed; logged and skipped
    FetchFailed,
    /// Busy count went past the limit
    LimitReached,
}
