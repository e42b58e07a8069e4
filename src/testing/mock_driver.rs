//! An in-memory, deterministic [`Driver`] used only by this crate's own
//! tests. Not part of the public API: a real backend is explicitly out of
//! scope for this crate.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::driver::Driver;
use crate::{Error, Result};

#[derive(Default)]
struct State {
    text: HashMap<String, String>,
    attributes: HashMap<(String, String), String>,
    visible: HashMap<String, bool>,
    visible_flip_at: HashMap<String, Instant>,
    visible_flip_to: HashMap<String, bool>,
    url: String,
    title: String,
}

pub struct MockDriver {
    state: Mutex<State>,
    poll_interval: Duration,
    wait_timeout: Duration,
}

impl MockDriver {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            poll_interval: Duration::from_millis(10),
            wait_timeout: Duration::from_secs(5),
        }
    }

    /// A driver whose own internal wait operations give up after
    /// `wait_timeout` rather than the 5s default; useful for exercising
    /// driver-level timeouts in tests without slowing the suite down.
    pub fn with_wait_timeout(wait_timeout: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            poll_interval: Duration::from_millis(5),
            wait_timeout,
        }
    }

    pub fn set_text(&self, selector: &str, text: &str) {
        self.state
            .lock()
            .unwrap()
            .text
            .insert(selector.to_string(), text.to_string());
    }

    pub fn set_attribute(&self, selector: &str, name: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .attributes
            .insert((selector.to_string(), name.to_string()), value.to_string());
    }

    pub fn set_visible(&self, selector: &str, visible: bool) {
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), visible);
        state.visible_flip_at.remove(selector);
    }

    /// `selector` reports `initial` until `after` elapses (measured from
    /// this call), then reports `!initial`.
    pub fn set_visible_after(&self, selector: &str, initial: bool, after: Duration) {
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), initial);
        state
            .visible_flip_at
            .insert(selector.to_string(), Instant::now() + after);
        state.visible_flip_to.insert(selector.to_string(), !initial);
    }

    pub fn set_text_after(&self, selector: &str, initial: &str, after: Duration, later: &str) {
        self.set_text(selector, initial);
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), true);
        state
            .visible_flip_at
            .entry(format!("__text__{selector}"))
            .or_insert_with(|| Instant::now() + after);
        state
            .text
            .insert(format!("__text_later__{selector}"), later.to_string());
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().unwrap().url = url.to_string();
    }

    pub fn set_title(&self, title: &str) {
        self.state.lock().unwrap().title = title.to_string();
    }

    fn resolve_visible(&self, selector: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if let Some(flip_at) = state.visible_flip_at.get(selector).copied() {
            if Instant::now() >= flip_at {
                let flip_to = state.visible_flip_to.get(selector).copied().unwrap_or(true);
                state.visible.insert(selector.to_string(), flip_to);
                state.visible_flip_at.remove(selector);
            }
        }
        *state.visible.get(selector).unwrap_or(&false)
    }

    fn resolve_text(&self, selector: &str) -> String {
        let mut state = self.state.lock().unwrap();
        let delayed_key = format!("__text__{selector}");
        if let Some(flip_at) = state.visible_flip_at.get(&delayed_key).copied() {
            if Instant::now() >= flip_at {
                if let Some(later) = state.text.remove(&format!("__text_later__{selector}")) {
                    state.text.insert(selector.to_string(), later);
                }
                state.visible_flip_at.remove(&delayed_key);
            }
        }
        state.text.get(selector).cloned().unwrap_or_default()
    }
}

impl Default for MockDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl Driver for MockDriver {
    fn current_url(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    fn navigate_to_url(&self, url: &str) -> Result<()> {
        self.state.lock().unwrap().url = url.to_string();
        Ok(())
    }

    fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    fn type_text(&self, selector: &str, text: &str) -> Result<()> {
        self.set_text(selector, text);
        Ok(())
    }

    fn select_option(&self, _selector: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn get_text(&self, selector: &str) -> Result<String> {
        Ok(self.resolve_text(selector))
    }

    fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .attributes
            .get(&(selector.to_string(), name.to_string()))
            .cloned())
    }

    fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.resolve_visible(selector))
    }

    fn is_enabled(&self, _selector: &str) -> Result<bool> {
        Ok(true)
    }

    fn wait_for_element(&self, selector: &str) -> Result<()> {
        self.poll_driver_side(|| Ok(self.state.lock().unwrap().visible.contains_key(selector)))
    }

    fn wait_for_element_to_be_visible(&self, selector: &str) -> Result<()> {
        self.poll_driver_side(|| self.is_visible(selector))
    }

    fn wait_for_element_to_be_hidden(&self, selector: &str) -> Result<()> {
        self.poll_driver_side(|| Ok(!self.is_visible(selector)?))
    }

    fn focus(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    fn hover(&self, _selector: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self, selector: &str) -> Result<()> {
        self.set_text(selector, "");
        Ok(())
    }

    fn get_page_title(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    fn execute_script(&self, _script: &str) -> Result<String> {
        Ok(String::new())
    }

    fn take_screenshot(&self) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }

    fn wait_for_navigation_idle(&self, _timeout: Duration) -> Result<()> {
        Ok(())
    }
}

impl MockDriver {
    /// The driver's own bounded poll, distinct from the verification
    /// engine's: a driver wait operation does not retry indefinitely, it
    /// waits up to its own configured timeout and then fails.
    fn poll_driver_side(&self, mut condition: impl FnMut() -> Result<bool>) -> Result<()> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if condition()? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::DriverTimeout("wait timed out".to_string()));
            }
            std::thread::sleep(self.poll_interval);
        }
    }
}
