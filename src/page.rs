//! Typed page base with an element factory, wait strategies, fluent
//! actions, and navigation routing (C6).
//!
//! Pages are constructed explicitly from a [`PageContext`] rather than
//! resolving their own dependencies from a lookup facade: the composition
//! root ([`crate::App`]) is the only thing that ever builds one.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::driver::Driver;
use crate::verify::VerificationContext;
use crate::{Error, Result};

/// What, if anything, an interaction waits for before acting on an
/// element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    None,
    Visible,
    Hidden,
    Clickable,
    Enabled,
}

/// An immutable element descriptor. Built once via [`ElementBuilder`]
/// during a page's construction and never mutated afterward.
#[derive(Debug, Clone)]
pub struct Element {
    pub selector: String,
    pub description: String,
    pub timeout: Duration,
    pub wait_strategy: WaitStrategy,
    pub retry_interval: Duration,
}

/// Builds an [`Element`], defaulting unset fields from the owning
/// [`PageContext`]'s options.
pub struct ElementBuilder {
    selector: String,
    description: Option<String>,
    timeout: Duration,
    wait_strategy: WaitStrategy,
    retry_interval: Duration,
}

impl ElementBuilder {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            description: None,
            timeout: Duration::from_secs(10),
            wait_strategy: WaitStrategy::Visible,
            retry_interval: Duration::from_millis(100),
        }
    }

    /// A selector matching `[data-testid="<id>"]`, without the caller
    /// referencing any engine-specific selector syntax.
    pub fn by_test_id(id: &str) -> Self {
        Self::new(format!("[data-testid=\"{id}\"]"))
    }

    /// An engine-neutral text selector.
    pub fn by_text(text: &str) -> Self {
        Self::new(format!("text={text}"))
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_wait_strategy(mut self, strategy: WaitStrategy) -> Self {
        self.wait_strategy = strategy;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn build(self) -> Element {
        let description = self.description.unwrap_or_else(|| self.selector.clone());
        Element {
            selector: self.selector,
            description,
            timeout: self.timeout,
            wait_strategy: self.wait_strategy,
            retry_interval: self.retry_interval,
        }
    }
}

/// Everything a page needs at construction time: a shared driver handle
/// and the timeout defaults it should apply to elements built without an
/// explicit timeout.
#[derive(Clone)]
pub struct PageContext {
    pub(crate) driver: Arc<dyn Driver>,
    pub(crate) default_wait_timeout: Duration,
    pub(crate) base_url: url::Url,
}

impl PageContext {
    pub fn new(driver: Arc<dyn Driver>, default_wait_timeout: Duration, base_url: url::Url) -> Self {
        Self {
            driver,
            default_wait_timeout,
            base_url,
        }
    }

    pub fn element(&self, selector: impl Into<String>) -> ElementBuilder {
        ElementBuilder::new(selector).with_timeout(self.default_wait_timeout)
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    /// A verification context bound to `page`, this context's driver, and
    /// its configured default timeout.
    pub fn verify<'p, P>(&'p self, page: &'p P) -> VerificationContext<'p, P> {
        VerificationContext::new(page, self.driver.as_ref(), self.default_wait_timeout)
    }
}

/// A user-defined screen. `url_pattern` may contain `{placeholder}`
/// segments substituted by [`substitute_params`] during `navigate_to`.
/// Pages that are only ever attached to (never navigated to directly) can
/// return an empty pattern.
pub trait Page: Sized {
    fn url_pattern() -> &'static str {
        ""
    }

    /// Build the page and its elements from an already-resolved context.
    /// Analogous to a user-defined `configure_elements()` step: this is
    /// the one place a concrete page type lists its named elements.
    fn new(context: PageContext) -> Self;

    /// Shared context accessor, used by the fluent action helpers below.
    fn context(&self) -> &PageContext;
}

/// Substitute `{name}` segments in `pattern` with URL-encoded values from
/// `params`, failing if a referenced name has no entry.
pub fn substitute_params(pattern: &str, params: &HashMap<&str, &str>) -> Result<String> {
    let mut result = String::with_capacity(pattern.len());
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            let value = params.get(name.as_str()).ok_or_else(|| {
                Error::InvalidConfiguration(format!("missing route parameter {{{name}}}"))
            })?;
            result.push_str(&url_encode(value));
        } else {
            result.push(c);
        }
    }
    Ok(result)
}

fn url_encode(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Fluent action helpers shared by every page. Each returns `&Self` so
/// calls chain: `page.click(|p| &p.submit_button, false)?.wait_for_element(...)`.
pub trait FluentActions: Page {
    fn click(&self, select: impl Fn(&Self) -> &Element, await_navigation: bool) -> Result<&Self> {
        self.act(select, await_navigation, |driver, el| driver.click(&el.selector))
    }

    fn type_text(&self, select: impl Fn(&Self) -> &Element, text: &str) -> Result<&Self> {
        self.act(select, false, |driver, el| driver.type_text(&el.selector, text))
    }

    fn select(&self, select: impl Fn(&Self) -> &Element, value: &str) -> Result<&Self> {
        self.act(select, false, |driver, el| driver.select_option(&el.selector, value))
    }

    fn focus(&self, select: impl Fn(&Self) -> &Element) -> Result<&Self> {
        self.act(select, false, |driver, el| driver.focus(&el.selector))
    }

    fn hover(&self, select: impl Fn(&Self) -> &Element) -> Result<&Self> {
        self.act(select, false, |driver, el| driver.hover(&el.selector))
    }

    fn clear(&self, select: impl Fn(&Self) -> &Element) -> Result<&Self> {
        self.act(select, false, |driver, el| driver.clear(&el.selector))
    }

    fn wait_for_element(&self, select: impl Fn(&Self) -> &Element) -> Result<&Self> {
        let el = select(self);
        self.context().driver().wait_for_element(&el.selector)?;
        Ok(self)
    }

    fn wait_for_element_to_be_visible(&self, select: impl Fn(&Self) -> &Element) -> Result<&Self> {
        let el = select(self);
        self.context()
            .driver()
            .wait_for_element_to_be_visible(&el.selector)?;
        Ok(self)
    }

    fn act(
        &self,
        select: impl Fn(&Self) -> &Element,
        await_navigation: bool,
        op: impl FnOnce(&dyn Driver, &Element) -> Result<()>,
    ) -> Result<&Self> {
        let el = select(self);
        apply_wait_strategy(self.context().driver(), el)?;
        op(self.context().driver(), el)?;
        if await_navigation {
            self.context()
                .driver()
                .wait_for_navigation_idle(el.timeout)?;
        }
        Ok(self)
    }

    /// `then<T>()` reads identically to [`Page::new`] called through a
    /// fluent chain, so `page.click(...).then::<NextPage>()` stays
    /// readable without naming an intermediate app/composition-root value.
    fn then<T: Page>(&self) -> T {
        T::new(self.context().clone())
    }
}

impl<P: Page> FluentActions for P {}

fn apply_wait_strategy(driver: &dyn Driver, element: &Element) -> Result<()> {
    match element.wait_strategy {
        WaitStrategy::None => Ok(()),
        WaitStrategy::Visible | WaitStrategy::Clickable => {
            driver.wait_for_element_to_be_visible(&element.selector)
        }
        WaitStrategy::Hidden => driver.wait_for_element_to_be_hidden(&element.selector),
        WaitStrategy::Enabled => wait_for_element_to_be_enabled(driver, element),
    }
}

/// No driver primitive polls enabled-ness directly (C7 only exposes
/// `is_enabled` as a point-in-time check), so this strategy polls it
/// itself, bounded by the element's own timeout/retry interval rather than
/// delegating to existence-only waits.
fn wait_for_element_to_be_enabled(driver: &dyn Driver, element: &Element) -> Result<()> {
    let deadline = Instant::now() + element.timeout;
    loop {
        if driver.is_enabled(&element.selector)? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(Error::DriverTimeout(format!(
                "{} did not become enabled within {:.3}s",
                element.description,
                element.timeout.as_secs_f64()
            )));
        }
        std::thread::sleep(element.retry_interval);
    }
}
