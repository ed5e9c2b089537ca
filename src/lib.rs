//! DevHelm agent - drives the Junie IDE assistant from DevHelm tasks
//!
//! The agent polls the DevHelm task API, watches the screen for Junie's
//! "ready" indicator and types prompts into its input box.

pub mod agent;
pub mod config;
pub mod error;
pub mod logging;
pub mod screen;
pub mod task;
pub mod ui;

pub use error::{AgentError, Result};
