//! Screen automation capability
//!
//! The agent only needs two things from the desktop: find a template image
//! on screen, and send input. Both sit behind [`ScreenAutomation`] so the UI
//! bridge and control loop run against [`MockScreen`] in tests.

use std::path::{Path, PathBuf};

use thiserror::Error;

#[cfg(feature = "desktop")]
pub mod desktop;
pub mod mock;
pub mod score;

#[cfg(feature = "desktop")]
pub use desktop::DesktopScreen;
pub use mock::{MockScreen, ScreenEvent};
pub use score::zero_mean_correlation;

/// Errors from the screen capability
#[derive(Debug, Error)]
pub enum ScreenError {
    #[error("Screen capture failed: {0}")]
    Capture(String),

    #[error("Template {path} could not be loaded: {message}")]
    TemplateLoad { path: PathBuf, message: String },

    #[error("Template matching failed: {0}")]
    Match(String),

    #[error("Input injection failed: {0}")]
    Input(String),

    #[error("Screen automation unavailable: {0}")]
    Unavailable(String),
}

/// Matching parameters for [`ScreenAutomation::locate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchOptions {
    /// Minimum normalised correlation in `0.0..=1.0`
    pub confidence: f32,
    pub grayscale: bool,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            confidence: 0.9,
            grayscale: true,
        }
    }
}

/// Absolute screen coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Bounding box of a located template
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub left: i32,
    pub top: i32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: i32, top: i32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.left + (self.width / 2) as i32,
            y: self.top + (self.height / 2) as i32,
        }
    }
}

/// Locate and send-input primitives
pub trait ScreenAutomation: Send {
    /// Find `template` on screen. `Ok(None)` means it is not visible.
    fn locate(&mut self, template: &Path, options: &MatchOptions) -> Result<Option<Region>, ScreenError>;

    fn click(&mut self, at: Point) -> Result<(), ScreenError>;

    /// Type `text` literally in one go. Callers pace keystrokes themselves.
    fn type_text(&mut self, text: &str) -> Result<(), ScreenError>;

    fn press_enter(&mut self) -> Result<(), ScreenError>;
}

impl<S: ScreenAutomation + ?Sized> ScreenAutomation for Box<S> {
    fn locate(&mut self, template: &Path, options: &MatchOptions) -> Result<Option<Region>, ScreenError> {
        (**self).locate(template, options)
    }

    fn click(&mut self, at: Point) -> Result<(), ScreenError> {
        (**self).click(at)
    }

    fn type_text(&mut self, text: &str) -> Result<(), ScreenError> {
        (**self).type_text(text)
    }

    fn press_enter(&mut self) -> Result<(), ScreenError> {
        (**self).press_enter()
    }
}

/// The real desktop backend when compiled in
pub fn default_backend() -> Result<Box<dyn ScreenAutomation>, ScreenError> {
    #[cfg(feature = "desktop")]
    {
        Ok(Box::new(DesktopScreen::new()))
    }

    #[cfg(not(feature = "desktop"))]
    {
        Err(ScreenError::Unavailable(
            "built without the `desktop` feature; rebuild with `--features desktop`".to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_center() {
        let region = Region::new(100, 200, 80, 20);
        assert_eq!(region.center(), Point::new(140, 210));
    }

    #[test]
    fn test_region_center_odd_size() {
        let region = Region::new(0, 0, 5, 3);
        assert_eq!(region.center(), Point::new(2, 1));
    }

    #[test]
    fn test_match_options_default() {
        let options = MatchOptions::default();
        assert_eq!(options.confidence, 0.9);
        assert!(options.grayscale);
    }

    #[test]
    fn test_boxed_backend_delegates() {
        let mock = MockScreen::new();
        let handle = mock.clone();
        let mut boxed: Box<dyn ScreenAutomation> = Box::new(mock);
        boxed.click(Point::new(1, 2)).unwrap();
        boxed.press_enter().unwrap();
        assert_eq!(
            handle.events(),
            vec![ScreenEvent::Clicked(Point::new(1, 2)), ScreenEvent::Enter]
        );
    }

    #[cfg(not(feature = "desktop"))]
    #[test]
    fn test_default_backend_unavailable_without_feature() {
        assert!(matches!(default_backend(), Err(ScreenError::Unavailable(_))));
    }
}
