//! Composition root (C1/C6 glue): owns the hosting strategy and driver for
//! the lifetime of a run, and is the only thing that ever constructs a
//! page.

use std::collections::HashMap;
use std::sync::Arc;

use url::Url;

use crate::driver::Driver;
use crate::hosting::HostingStrategy;
use crate::options::Options;
use crate::page::{substitute_params, Page, PageContext};
use crate::{Error, Result};

/// The runnable application produced by [`crate::options::OptionsBuilder::build`].
///
/// Owns the hosting strategy and (once `start()` has run) the resolved
/// base URL. The driver factory is invoked lazily on first use so that
/// `build()` itself never has to construct a driver.
pub struct App {
    options: Options,
    strategy: Box<dyn HostingStrategy>,
    driver_factory: Option<Arc<dyn Fn() -> Arc<dyn Driver> + Send + Sync>>,
    driver: Option<Arc<dyn Driver>>,
    base_url: Option<Url>,
}

impl App {
    pub(crate) fn new(
        options: Options,
        strategy: Box<dyn HostingStrategy>,
        driver_factory: Option<Arc<dyn Fn() -> Arc<dyn Driver> + Send + Sync>>,
    ) -> Self {
        Self {
            options,
            strategy,
            driver_factory,
            driver: None,
            base_url: None,
        }
    }

    /// Launch (or attach to) the configured application and construct the
    /// driver. Idempotent: calling `start` twice after a successful first
    /// call is a no-op.
    pub async fn start(&mut self) -> Result<()> {
        if self.base_url.is_some() {
            return Ok(());
        }

        let result = self.strategy.start().await?;
        self.base_url = Some(result.base_url);

        let factory = self.driver_factory.as_ref().ok_or_else(|| {
            Error::InvalidConfiguration(
                "no driver factory registered; call use_driver on the builder".to_string(),
            )
        })?;
        self.driver = Some(factory());
        Ok(())
    }

    fn context(&self) -> Result<PageContext> {
        let driver = self.driver.clone().ok_or_else(|| {
            Error::InvalidConfiguration("app.start() must complete before using a page".to_string())
        })?;
        let base_url = self.base_url.clone().ok_or_else(|| {
            Error::InvalidConfiguration("app.start() must complete before using a page".to_string())
        })?;
        Ok(PageContext::new(driver, self.options.default_wait_timeout, base_url))
    }

    /// Resolve `T`, navigate to its URL pattern (substituting `params`),
    /// and return it.
    pub fn navigate_to<T: Page>(&self, params: &HashMap<&str, &str>) -> Result<T> {
        let context = self.context()?;
        let path = substitute_params(T::url_pattern(), params)?;
        let mut url = context.base_url.clone();
        url.set_path(&path);
        context.driver().navigate_to_url(url.as_str())?;
        Ok(T::new(context))
    }

    /// Resolve `T` without navigating.
    pub fn on<T: Page>(&self) -> Result<T> {
        let context = self.context()?;
        Ok(T::new(context))
    }

    /// Tear down the hosting strategy (child process, mutated env, ...).
    /// Idempotent.
    pub async fn dispose(&mut self) -> Result<()> {
        self.strategy.dispose().await
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}
