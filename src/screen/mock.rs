//! In-memory screen for tests
//!
//! Clones share state, so a test can keep a handle, move another clone into
//! the UI bridge, then flip template visibility or inspect the recorded
//! input between iterations.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{MatchOptions, Point, Region, ScreenAutomation, ScreenError};

/// Something the mock was asked to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScreenEvent {
    /// Template file name and whether it was found
    Located(String, bool),
    Clicked(Point),
    Typed(String),
    Enter,
}

#[derive(Debug, Default)]
struct MockState {
    visible: HashMap<String, Region>,
    fail_match: bool,
    fail_input: bool,
    events: Vec<ScreenEvent>,
    match_options: Vec<MatchOptions>,
}

#[derive(Debug, Clone, Default)]
pub struct MockScreen {
    state: Arc<Mutex<MockState>>,
}

impl MockScreen {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make the template with this file name visible at `region`
    pub fn show(&self, template_name: &str, region: Region) {
        self.state().visible.insert(template_name.to_string(), region);
    }

    pub fn hide(&self, template_name: &str) {
        self.state().visible.remove(template_name);
    }

    /// Make every `locate` call fail with a matcher error
    pub fn fail_matching(&self, fail: bool) {
        self.state().fail_match = fail;
    }

    /// Make every click/type/enter fail with an input error
    pub fn fail_input(&self, fail: bool) {
        self.state().fail_input = fail;
    }

    pub fn events(&self) -> Vec<ScreenEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    /// Options passed to each `locate` call, in order
    pub fn match_options(&self) -> Vec<MatchOptions> {
        self.state().match_options.clone()
    }

    /// Every string typed so far
    pub fn typed(&self) -> Vec<String> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                ScreenEvent::Typed(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    fn input(&self, event: ScreenEvent) -> Result<(), ScreenError> {
        let mut state = self.state();
        if state.fail_input {
            return Err(ScreenError::Input(format!("mock input failure on {:?}", event)));
        }
        state.events.push(event);
        Ok(())
    }
}

impl ScreenAutomation for MockScreen {
    fn locate(&mut self, template: &Path, options: &MatchOptions) -> Result<Option<Region>, ScreenError> {
        let name = template
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut state = self.state();
        state.match_options.push(*options);
        if state.fail_match {
            return Err(ScreenError::Match(format!("mock matcher failure for {}", name)));
        }
        let found = state.visible.get(&name).copied();
        state.events.push(ScreenEvent::Located(name, found.is_some()));
        Ok(found)
    }

    fn click(&mut self, at: Point) -> Result<(), ScreenError> {
        self.input(ScreenEvent::Clicked(at))
    }

    fn type_text(&mut self, text: &str) -> Result<(), ScreenError> {
        self.input(ScreenEvent::Typed(text.to_string()))
    }

    fn press_enter(&mut self) -> Result<(), ScreenError> {
        self.input(ScreenEvent::Enter)
    }
}
