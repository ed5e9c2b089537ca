//! UI bridge - readiness check and prompt delivery
//!
//! "Not ready" and "label not found" are ordinary `false` results. A missing
//! template file is caught once, when the bridge is built, and input that
//! fails after the target was found comes back as an error.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::screen::ScreenError;

pub mod bridge;
pub mod templates;

pub use bridge::{CLICK_OFFSET_PX, MATCH_CONFIDENCE, UiBridge};
pub use templates::TemplateSet;

#[derive(Debug, Error)]
pub enum UiError {
    #[error("Template image not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    #[error("Prompt target found but input failed: {0}")]
    Injection(#[from] ScreenError),
}

/// What the control loop needs from the assistant's UI
#[async_trait]
pub trait PromptSurface: Send {
    /// True iff the readiness indicator is on screen. Never errors.
    async fn is_ready_for_prompt(&mut self) -> bool;

    /// Type `text` into the prompt box and submit it. `Ok(false)` when the
    /// input could not be located.
    async fn give_prompt(&mut self, text: &str) -> Result<bool, UiError>;
}
