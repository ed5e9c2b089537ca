//! Desktop backend: xcap capture, imageproc matching, enigo input
//!
//! The best normalised cross-correlation peak on the primary monitor is
//! rescored with [`zero_mean_correlation`] before the confidence check, so
//! flat areas of the screen do not pass for a mostly flat template. Only
//! grayscale matching is supported.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use image::{DynamicImage, GrayImage};
use imageproc::template_matching::{MatchTemplateMethod, find_extremes, match_template};
use xcap::Monitor;

use super::{MatchOptions, Point, Region, ScreenAutomation, ScreenError, zero_mean_correlation};

/// Primary-monitor screenshot with its origin in desktop coordinates
struct Capture {
    image: GrayImage,
    origin: Point,
}

#[derive(Default)]
pub struct DesktopScreen {
    templates: HashMap<PathBuf, GrayImage>,
}

impl DesktopScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn template(&mut self, path: &Path) -> Result<&GrayImage, ScreenError> {
        if !self.templates.contains_key(path) {
            let image = image::open(path).map_err(|e| ScreenError::TemplateLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
            self.templates.insert(path.to_path_buf(), image.to_luma8());
        }
        self.templates.get(path).ok_or_else(|| ScreenError::TemplateLoad {
            path: path.to_path_buf(),
            message: "template cache miss".to_string(),
        })
    }

    fn capture() -> Result<Capture, ScreenError> {
        let monitors = Monitor::all().map_err(|e| ScreenError::Capture(e.to_string()))?;
        let index = monitors.iter().position(|m| m.is_primary()).unwrap_or(0);
        let monitor = monitors
            .into_iter()
            .nth(index)
            .ok_or_else(|| ScreenError::Capture("no monitors found".to_string()))?;

        let origin = Point::new(monitor.x(), monitor.y());
        let rgba = monitor.capture_image().map_err(|e| ScreenError::Capture(e.to_string()))?;

        Ok(Capture {
            image: DynamicImage::ImageRgba8(rgba).to_luma8(),
            origin,
        })
    }

    fn enigo() -> Result<Enigo, ScreenError> {
        Enigo::new(&Settings::default()).map_err(|e| ScreenError::Input(e.to_string()))
    }
}

impl ScreenAutomation for DesktopScreen {
    fn locate(&mut self, template: &Path, options: &MatchOptions) -> Result<Option<Region>, ScreenError> {
        if !options.grayscale {
            return Err(ScreenError::Match("colour matching is not supported".to_string()));
        }

        let capture = Self::capture()?;
        let needle = self.template(template)?;

        if needle.width() > capture.image.width() || needle.height() > capture.image.height() {
            return Ok(None);
        }

        let scores = match_template(&capture.image, needle, MatchTemplateMethod::CrossCorrelationNormalized);
        let extremes = find_extremes(&scores);
        let (x, y) = extremes.max_value_location;
        let score = zero_mean_correlation(
            capture.image.as_raw(),
            capture.image.width(),
            needle.as_raw(),
            needle.width(),
            (x, y),
        );
        log::trace!(
            "{} peak {:.3}, zero-mean score {:.3} at ({}, {})",
            template.display(),
            extremes.max_value,
            score,
            x,
            y
        );

        if score < options.confidence {
            return Ok(None);
        }

        Ok(Some(Region::new(
            capture.origin.x + x as i32,
            capture.origin.y + y as i32,
            needle.width(),
            needle.height(),
        )))
    }

    fn click(&mut self, at: Point) -> Result<(), ScreenError> {
        let mut enigo = Self::enigo()?;
        enigo
            .move_mouse(at.x, at.y, Coordinate::Abs)
            .map_err(|e| ScreenError::Input(e.to_string()))?;
        enigo
            .button(Button::Left, Direction::Click)
            .map_err(|e| ScreenError::Input(e.to_string()))
    }

    fn type_text(&mut self, text: &str) -> Result<(), ScreenError> {
        Self::enigo()?
            .text(text)
            .map_err(|e| ScreenError::Input(e.to_string()))
    }

    fn press_enter(&mut self) -> Result<(), ScreenError> {
        Self::enigo()?
            .key(Key::Return, Direction::Click)
            .map_err(|e| ScreenError::Input(e.to_string()))
    }
}
