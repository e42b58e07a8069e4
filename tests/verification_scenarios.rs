//! End-to-end coverage of the verification engine's wait-before-assert
//! contract, against a small deterministic driver defined locally (the
//! crate's own mock driver is test-only and not part of the public API).

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use fluent_harness_core::driver::Driver;
use fluent_harness_core::page::ElementBuilder;
use fluent_harness_core::verify::VerificationContext;
use fluent_harness_core::{Error, Result};

#[derive(Default)]
struct State {
    visible: HashMap<String, bool>,
    flip_at: HashMap<String, Instant>,
    text: HashMap<String, String>,
    text_flip_at: Option<Instant>,
    text_after: Option<String>,
}

struct TimedDriver {
    state: Mutex<State>,
}

impl TimedDriver {
    fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn set_visible_after(&self, selector: &str, initial: bool, after: Duration) {
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), initial);
        state.flip_at.insert(selector.to_string(), Instant::now() + after);
    }

    fn set_visible(&self, selector: &str, visible: bool) {
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), visible);
        state.flip_at.remove(selector);
    }

    fn set_text(&self, selector: &str, text: &str) {
        self.state
            .lock()
            .unwrap()
            .text
            .insert(selector.to_string(), text.to_string());
    }

    fn set_text_after(&self, selector: &str, initial: &str, after: Duration, later: &str) {
        self.set_text(selector, initial);
        let mut state = self.state.lock().unwrap();
        state.visible.insert(selector.to_string(), true);
        state.text_flip_at = Some(Instant::now() + after);
        state.text_after = Some(later.to_string());
    }

    fn resolve_visible(&self, selector: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if let Some(flip_at) = state.flip_at.get(selector).copied() {
            if Instant::now() >= flip_at {
                let current = *state.visible.get(selector).unwrap_or(&false);
                state.visible.insert(selector.to_string(), !current);
                state.flip_at.remove(selector);
            }
        }
        *state.visible.get(selector).unwrap_or(&false)
    }

    fn resolve_text(&self, selector: &str) -> String {
        let mut state = self.state.lock().unwrap();
        if let Some(flip_at) = state.text_flip_at {
            if Instant::now() >= flip_at {
                if let Some(later) = state.text_after.take() {
                    state.text.insert(selector.to_string(), later);
                }
                state.text_flip_at = None;
            }
        }
        state.text.get(selector).cloned().unwrap_or_default()
    }
}

impl Driver for TimedDriver {
    fn current_url(&self) -> Result<String> {
        Ok(String::new())
    }
    fn navigate_to_url(&self, _url: &str) -> Result<()> {
        Ok(())
    }
    fn click(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn type_text(&self, _selector: &str, _text: &str) -> Result<()> {
        Ok(())
    }
    fn select_option(&self, _selector: &str, _value: &str) -> Result<()> {
        Ok(())
    }
    fn get_text(&self, selector: &str) -> Result<String> {
        Ok(self.resolve_text(selector))
    }
    fn get_attribute(&self, _selector: &str, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }
    fn is_visible(&self, selector: &str) -> Result<bool> {
        Ok(self.resolve_visible(selector))
    }
    fn is_enabled(&self, _selector: &str) -> Result<bool> {
        Ok(true)
    }
    fn wait_for_element(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn wait_for_element_to_be_visible(&self, selector: &str) -> Result<()> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if self.is_visible(selector)? {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::DriverTimeout("wait timed out".to_string()));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }
    fn wait_for_element_to_be_hidden(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn focus(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn hover(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn clear(&self, _selector: &str) -> Result<()> {
        Ok(())
    }
    fn get_page_title(&self) -> Result<String> {
        Ok(String::new())
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

/// `#btn` becomes visible at 200ms. A 1s timeout sees the transition and
/// succeeds; a 100ms timeout gives up first with an informative message.
#[test]
fn visible_waits_for_a_late_transition_then_succeeds() {
    let driver = TimedDriver::new();
    driver.set_visible_after("#btn", false, Duration::from_millis(200));
    let btn = ElementBuilder::new("#btn").build();

    let ctx = VerificationContext::new(&(), &driver, Duration::from_secs(1));
    assert!(ctx.visible(&btn).is_ok());
}

#[test]
fn visible_reports_selector_and_reason_on_timeout() {
    let driver = TimedDriver::new();
    driver.set_visible_after("#btn", false, Duration::from_secs(10));
    let btn = ElementBuilder::new("#btn").build();

    let ctx = VerificationContext::new(&(), &driver, Duration::from_millis(100));
    let err = ctx.visible(&btn).unwrap_err();
    assert!(matches!(err, Error::VerificationFailure(_)));
    let message = err.to_string();
    assert!(message.contains("#btn"));
    assert!(message.contains("did not become visible"));
}

/// `#msg` transitions from "Loading..." to "Success!" at 300ms.
/// `text_contains(msg, "Success")` succeeds within a 1s timeout, and without
/// the transition it fails reporting the last observed text.
#[test]
fn text_contains_succeeds_once_the_transition_lands() {
    let driver = TimedDriver::new();
    driver.set_text_after("#msg", "Loading...", Duration::from_millis(300), "Success!");
    let msg = ElementBuilder::new("#msg").build();

    let ctx = VerificationContext::new(&(), &driver, Duration::from_secs(1));
    assert!(ctx.text_contains(&msg, "Success").is_ok());
}

#[test]
fn text_contains_reports_last_observed_text_without_the_transition() {
    let driver = TimedDriver::new();
    driver.set_text("#msg", "Loading...");
    driver.set_visible("#msg", true);
    let msg = ElementBuilder::new("#msg").build();

    let ctx = VerificationContext::new(&(), &driver, Duration::from_millis(150));
    let err = ctx.text_contains(&msg, "Success").unwrap_err();
    assert!(err.to_string().contains("Loading..."));
}
