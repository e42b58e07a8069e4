//! The abstract browser driver contract (C7).
//!
//! This module defines the surface that [`crate::verify`] and
//! [`crate::page`] are written against. It has no implementation in this
//! crate — supplying a concrete driver (wrapping a real browser automation
//! engine) is the responsibility of the harness's surrounding application.
//! Query operations must not retry internally; retrying a query is the
//! verification engine's job, not the driver's.

use crate::Result;
use std::time::Duration;

/// Primitive operations a browser driver must expose.
///
/// Wait operations accept a timeout sourced from the driver's own defaults;
/// implementations decide how that default is configured. Everything above
/// this trait (the verification engine, the page/element model) only ever
/// calls through it, so any backend — a real browser, a recorded fixture, a
/// mock used in tests — can stand in transparently.
pub trait Driver: Send + Sync {
    /// The URL the driver currently considers itself to be on.
    fn current_url(&self) -> Result<String>;

    /// Navigate to an absolute URL and wait for the navigation to commit.
    fn navigate_to_url(&self, url: &str) -> Result<()>;

    /// Click the first element matching `selector`.
    fn click(&self, selector: &str) -> Result<()>;

    /// Type `text` into the first element matching `selector`.
    fn type_text(&self, selector: &str, text: &str) -> Result<()>;

    /// Select an `<option>` (or equivalent) with the given value.
    fn select_option(&self, selector: &str, value: &str) -> Result<()>;

    /// Return the rendered text content of the first matching element.
    fn get_text(&self, selector: &str) -> Result<String>;

    /// Return the named attribute of the first matching element, or `None`
    /// if the attribute is absent.
    fn get_attribute(&self, selector: &str, name: &str) -> Result<Option<String>>;

    /// Whether the first matching element is currently visible. Does not
    /// wait; a non-existent element is not visible.
    fn is_visible(&self, selector: &str) -> Result<bool>;

    /// Whether the first matching element is currently enabled for
    /// interaction.
    fn is_enabled(&self, selector: &str) -> Result<bool>;

    /// Block (bounded by the driver's own timeout) until an element
    /// matching `selector` exists in the DOM.
    fn wait_for_element(&self, selector: &str) -> Result<()>;

    /// Block until an element matching `selector` exists and is visible.
    fn wait_for_element_to_be_visible(&self, selector: &str) -> Result<()>;

    /// Block until an element matching `selector` is absent or hidden.
    fn wait_for_element_to_be_hidden(&self, selector: &str) -> Result<()>;

    /// Move focus to the first matching element.
    fn focus(&self, selector: &str) -> Result<()>;

    /// Hover the pointer over the first matching element.
    fn hover(&self, selector: &str) -> Result<()>;

    /// Clear the value of the first matching input-like element.
    fn clear(&self, selector: &str) -> Result<()>;

    /// The current page's title.
    fn get_page_title(&self) -> Result<String>;

    /// Evaluate `script` and return its serialized result.
    fn execute_script(&self, script: &str) -> Result<String>;

    /// Capture a screenshot of the current page.
    fn take_screenshot(&self) -> Result<Vec<u8>>;

    /// Block until any pending navigation/load-idle condition settles.
    /// Used by fluent actions invoked with `await_navigation = true`.
    fn wait_for_navigation_idle(&self, timeout: Duration) -> Result<()>;
}
