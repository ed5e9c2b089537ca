//! UI bridge over a screen automation backend

use std::time::Duration;

use async_trait::async_trait;

use super::{PromptSurface, TemplateSet, UiError};
use crate::config::UiConfig;
use crate::screen::{MatchOptions, Point, Region, ScreenAutomation};

/// Minimum match score for both templates
pub const MATCH_CONFIDENCE: f32 = 0.9;

/// Extra horizontal distance past the label's width when aiming at the input
pub const CLICK_OFFSET_PX: i32 = 10;

const DEFAULT_SETTLE: Duration = Duration::from_secs(1);
const DEFAULT_KEYSTROKE_INTERVAL: Duration = Duration::from_millis(100);

/// Drives the assistant's prompt box through template matching and
/// synthetic input
pub struct UiBridge<S> {
    screen: S,
    templates: TemplateSet,
    /// Pause after clicking the input so focus can land
    settle: Duration,
    keystroke_interval: Duration,
}

impl<S: ScreenAutomation> UiBridge<S> {
    pub fn new(screen: S, templates: TemplateSet) -> Self {
        Self {
            screen,
            templates,
            settle: DEFAULT_SETTLE,
            keystroke_interval: DEFAULT_KEYSTROKE_INTERVAL,
        }
    }

    /// Resolve templates from config; fails if either image is missing
    pub fn from_config(screen: S, config: &UiConfig) -> Result<Self, UiError> {
        let templates = TemplateSet::resolve(config)?;
        Ok(Self::new(screen, templates).with_timing(config.settle(), config.keystroke_interval()))
    }

    pub fn with_timing(mut self, settle: Duration, keystroke_interval: Duration) -> Self {
        self.settle = settle;
        self.keystroke_interval = keystroke_interval;
        self
    }

    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    pub fn screen(&self) -> &S {
        &self.screen
    }

    fn match_options() -> MatchOptions {
        MatchOptions {
            confidence: MATCH_CONFIDENCE,
            grayscale: true,
        }
    }

    /// One character per keystroke interval, sleeping on the runtime so a
    /// shutdown can land between keystrokes. A zero interval sends the text
    /// in one call.
    async fn type_paced(&mut self, text: &str) -> Result<(), UiError> {
        if self.keystroke_interval.is_zero() {
            self.screen.type_text(text)?;
            return Ok(());
        }

        let mut buf = [0u8; 4];
        for (i, ch) in text.chars().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.keystroke_interval).await;
            }
            self.screen.type_text(ch.encode_utf8(&mut buf))?;
        }
        Ok(())
    }

    /// Click target for the input field: to the right of the label, on its
    /// vertical center
    pub fn input_target(label: &Region) -> Point {
        let center = label.center();
        Point::new(center.x + label.width as i32 + CLICK_OFFSET_PX, center.y)
    }
}

#[async_trait]
impl<S: ScreenAutomation> PromptSurface for UiBridge<S> {
    async fn is_ready_for_prompt(&mut self) -> bool {
        match self.screen.locate(&self.templates.ready, &Self::match_options()) {
            Ok(found) => found.is_some(),
            Err(e) => {
                log::debug!("Readiness check failed, treating as not ready: {}", e);
                false
            }
        }
    }

    async fn give_prompt(&mut self, text: &str) -> Result<bool, UiError> {
        let label = match self.screen.locate(&self.templates.input_label, &Self::match_options()) {
            Ok(Some(region)) => region,
            Ok(None) => {
                log::debug!("Input label {} not on screen", self.templates.input_label.display());
                return Ok(false);
            }
            Err(e) => {
                log::warn!("Could not search for input label: {}", e);
                return Ok(false);
            }
        };

        let target = Self::input_target(&label);
        log::trace!("Clicking prompt input at ({}, {})", target.x, target.y);
        self.screen.click(target)?;

        tokio::time::sleep(self.settle).await;

        self.type_paced(text).await?;
        self.screen.press_enter()?;
        Ok(true)
    }
}
