//! Chainable, wait-aware assertions over the driver (C5).
//!
//! There is exactly one verification API and exactly one failure kind:
//! every assertion here waits before it asserts, and every failure is an
//! `Error::VerificationFailure`. No "instant check" variant exists.

use std::time::{Duration, Instant};

use crate::driver::Driver;
use crate::page::Element;
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A lightweight view bound to a page, its driver, and the timeout
/// configured on `Options`. Carries no mutable state beyond the page
/// back-reference; every assertion method returns `&Self` for chaining.
pub struct VerificationContext<'p, P> {
    page: &'p P,
    driver: &'p dyn Driver,
    default_timeout: Duration,
}

impl<'p, P> VerificationContext<'p, P> {
    pub fn new(page: &'p P, driver: &'p dyn Driver, default_timeout: Duration) -> Self {
        Self {
            page,
            driver,
            default_timeout,
        }
    }

    /// Return the page this context is attached to, ending the chain.
    pub fn and(&self) -> &'p P {
        self.page
    }

    /// Poll `condition` until it returns `(true, _)` or `self.default_timeout`
    /// elapses. The second element of a successful evaluation is the
    /// currently observed value (text, title, url, attribute...), reported
    /// in the failure message on timeout. Any error raised by `condition` is
    /// treated as transient: polling continues and the error is remembered
    /// as the eventual failure's cause.
    fn poll_until<F>(&self, mut condition: F, failure_message: &str) -> Result<()>
    where
        F: FnMut() -> Result<(bool, String)>,
    {
        let deadline = Instant::now() + self.default_timeout;
        let mut last_observed: Option<String> = None;
        let mut last_error: Option<String> = None;

        loop {
            match condition() {
                Ok((true, _)) => return Ok(()),
                Ok((false, observed)) => last_observed = Some(observed),
                Err(e) => last_error = Some(e.to_string()),
            }

            if Instant::now() >= deadline {
                let cause = last_error.or_else(|| {
                    last_observed.map(|v| format!("last observed: {v:?}"))
                });
                return Err(Error::verification_timeout(
                    failure_message,
                    self.default_timeout,
                    cause.as_deref(),
                ));
            }

            std::thread::sleep(POLL_INTERVAL);
        }
    }

    /// Wrap a fallible body per the exception-wrapping policy: anything
    /// that isn't already `VerificationFailure` is wrapped, tagged
    /// `"(timeout)"` for `DriverTimeout` (a driver wait that never settled),
    /// otherwise tagged with the source error's variant name — including
    /// plain `DriverError`, which is a non-timeout driver failure (stale
    /// element, bad selector, driver crash) and must not be mislabeled as a
    /// timeout.
    fn guarded<F>(&self, body: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        match body() {
            Ok(()) => Ok(()),
            Err(Error::VerificationFailure(msg)) => Err(Error::VerificationFailure(msg)),
            Err(e @ Error::DriverTimeout(_)) => Err(Error::wrap_for_verification("timeout", &e.to_string())),
            Err(e) => Err(Error::wrap_for_verification(error_kind_name(&e), &e.to_string())),
        }
    }

    pub fn visible(&self, element: &Element) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let visible = self.driver.is_visible(&element.selector)?;
                    Ok((visible, visible.to_string()))
                },
                &format!("{} did not become visible", element.description),
            )
        })?;
        Ok(self)
    }

    pub fn not_visible(&self, element: &Element) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let visible = self.driver.is_visible(&element.selector)?;
                    Ok((!visible, visible.to_string()))
                },
                &format!("{} did not become hidden", element.description),
            )
        })?;
        Ok(self)
    }

    /// Byte-exact comparison; no trimming of either side.
    pub fn text_is(&self, element: &Element, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.driver.wait_for_element_to_be_visible(&element.selector)?;
            self.poll_until(
                || {
                    let text = self.driver.get_text(&element.selector)?;
                    Ok((text == expected, text))
                },
                &format!("{} text did not become {expected:?}", element.description),
            )
        })?;
        Ok(self)
    }

    pub fn text_contains(&self, element: &Element, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.driver.wait_for_element_to_be_visible(&element.selector)?;
            self.poll_until(
                || {
                    let text = self.driver.get_text(&element.selector)?;
                    Ok((text.contains(expected), text))
                },
                &format!("{} text did not contain {expected:?}", element.description),
            )
        })?;
        Ok(self)
    }

    pub fn has_attribute(&self, element: &Element, name: &str, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.driver.wait_for_element_to_be_visible(&element.selector)?;
            self.poll_until(
                || {
                    let value = self.driver.get_attribute(&element.selector, name)?;
                    let matched = value.as_deref() == Some(expected);
                    Ok((matched, value.unwrap_or_default()))
                },
                &format!(
                    "{} attribute {name:?} did not become {expected:?}",
                    element.description
                ),
            )
        })?;
        Ok(self)
    }

    pub fn title_is(&self, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let title = self.driver.get_page_title()?;
                    Ok((title == expected, title))
                },
                &format!("page title did not become {expected:?}"),
            )
        })?;
        Ok(self)
    }

    pub fn title_contains(&self, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let title = self.driver.get_page_title()?;
                    Ok((title.contains(expected), title))
                },
                &format!("page title did not contain {expected:?}"),
            )
        })?;
        Ok(self)
    }

    pub fn url_is(&self, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let url = self.driver.current_url()?;
                    Ok((url == expected, url))
                },
                &format!("url did not become {expected:?}"),
            )
        })?;
        Ok(self)
    }

    pub fn url_contains(&self, expected: &str) -> Result<&Self> {
        self.guarded(|| {
            self.poll_until(
                || {
                    let url = self.driver.current_url()?;
                    Ok((url.contains(expected), url))
                },
                &format!("url did not contain {expected:?}"),
            )
        })?;
        Ok(self)
    }
}

fn error_kind_name(e: &Error) -> &'static str {
    match e {
        Error::InvalidConfiguration(_) => "InvalidConfiguration",
        Error::DuplicateStrategy(_) => "DuplicateStrategy",
        Error::StartupFailed(_) => "StartupFailed",
        Error::ReadinessTimeout { .. } => "ReadinessTimeout",
        Error::VerificationFailure(_) => "VerificationFailure",
        Error::DriverError(_) => "DriverError",
        Error::DriverTimeout(_) => "DriverTimeout",
        Error::Other(_) => "Other",
    }
}
