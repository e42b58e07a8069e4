//! Options accumulation and the builder that turns it into a runnable `App` (C1).

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::driver::Driver;
use crate::hosting::dispatch::{DistributedTestHostOptions, LocalDotNetOptions, LocalNodeOptions};
use crate::hosting::{HostingConfig, HostingStrategy};
use crate::{Error, Result};
use std::sync::Arc;

/// Tri-state headless switch. `Auto` is resolved in [`OptionsBuilder::build`]
/// to `Off` iff a debugger is attached to the current process, else `On`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadlessMode {
    On,
    Off,
    Auto,
}

/// A case-insensitive string map used for environment variable overrides.
/// Lookups and inserts compare keys ignoring ASCII case; the casing of the
/// most recent insert for a given key is what's retained.
#[derive(Debug, Clone, Default)]
pub struct EnvVarMap {
    entries: Vec<(String, String)>,
}

impl EnvVarMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(key))
    }

    /// Insert or overwrite (last write wins) a key/value pair.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if let Some(idx) = self.position(&key) {
            self.entries[idx] = (key, value.into());
        } else {
            self.entries.push((key, value.into()));
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.position(key).map(|i| self.entries[i].1.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply this map onto a plain `HashMap`, overriding any existing keys
    /// (case-insensitively) and leaving everything else untouched. This is
    /// the "user-supplied map wins on conflict" half of the env merge order.
    pub fn apply_onto(&self, base: &mut HashMap<String, String>) {
        for (k, v) in self.iter() {
            if let Some(existing_key) = base
                .keys()
                .find(|existing| existing.eq_ignore_ascii_case(k))
                .cloned()
            {
                base.remove(&existing_key);
            }
            base.insert(k.to_string(), v.to_string());
        }
    }
}

/// Mutable, directly-accessible configuration record (C1 §3).
#[derive(Debug, Clone)]
pub struct Options {
    pub base_url: Option<Url>,
    pub default_wait_timeout: Duration,
    pub headless_mode: HeadlessMode,
    pub slow_mo: Duration,
    pub environment_name: String,
    pub spa_proxy_enabled: bool,
    pub environment_variables: EnvVarMap,
    pub log_level: log::LevelFilter,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            base_url: None,
            default_wait_timeout: Duration::from_secs(10),
            headless_mode: HeadlessMode::Auto,
            slow_mo: Duration::ZERO,
            environment_name: "Testing".to_string(),
            spa_proxy_enabled: false,
            environment_variables: EnvVarMap::new(),
            log_level: log::LevelFilter::Info,
        }
    }
}

/// Detects whether a debugger appears to be attached to the current
/// process. On Linux this reads `/proc/self/status` for a non-zero
/// `TracerPid`; on other platforms it conservatively reports `false`.
fn debugger_attached() -> bool {
    if let Ok(forced) = std::env::var("FLUENT_HARNESS_DEBUGGER_ATTACHED") {
        return forced == "1" || forced.eq_ignore_ascii_case("true");
    }

    #[cfg(target_os = "linux")]
    {
        if let Ok(status) = std::fs::read_to_string("/proc/self/status") {
            for line in status.lines() {
                if let Some(rest) = line.strip_prefix("TracerPid:") {
                    return rest.trim().parse::<u32>().unwrap_or(0) != 0;
                }
            }
        }
        false
    }

    #[cfg(not(target_os = "linux"))]
    {
        false
    }
}

/// Accumulates options and exactly one hosting strategy, then resolves
/// deferred defaults into a runnable [`crate::App`].
pub struct OptionsBuilder {
    options: Options,
    hosting: Option<HostingConfig>,
    driver_factory: Option<Arc<dyn Fn() -> Arc<dyn Driver> + Send + Sync>>,
}

impl Default for OptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            hosting: None,
            driver_factory: None,
        }
    }

    pub fn with_environment(mut self, name: impl Into<String>) -> Self {
        self.options.environment_name = name.into();
        self
    }

    pub fn with_environment_variable(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.options.environment_variables.insert(key, value);
        self
    }

    pub fn with_spa_proxy(mut self, enabled: bool) -> Self {
        self.options.spa_proxy_enabled = enabled;
        self
    }

    pub fn with_headless(mut self, mode: HeadlessMode) -> Self {
        self.options.headless_mode = mode;
        self
    }

    pub fn with_default_wait_timeout(mut self, timeout: Duration) -> Self {
        self.options.default_wait_timeout = timeout;
        self
    }

    /// Register the driver factory used to construct the singleton driver
    /// consumed by every page in the composition root.
    pub fn use_driver<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> Arc<dyn Driver> + Send + Sync + 'static,
    {
        self.driver_factory = Some(Arc::new(factory));
        self
    }

    fn register_strategy(&mut self, config: HostingConfig) -> Result<()> {
        if self.hosting.is_some() {
            return Err(Error::DuplicateStrategy(
                "a hosting strategy was already registered on this builder".to_string(),
            ));
        }
        self.hosting = Some(config);
        Ok(())
    }

    /// Register an externally-hosted application; no process is owned.
    pub fn use_external_server(mut self, base_url: Url) -> Result<Self> {
        self.register_strategy(HostingConfig::External { base_url })?;
        Ok(self)
    }

    /// Register a .NET application launched via `dotnet run`.
    ///
    /// `configure` runs against framework defaults; eager validation (a
    /// non-empty `project_path` and a present `base_url`) happens
    /// immediately afterwards, inside this call.
    pub fn use_local_dotnet(
        mut self,
        configure: impl FnOnce(&mut LocalDotNetOptions),
    ) -> Result<Self> {
        let mut cfg = LocalDotNetOptions::default();
        configure(&mut cfg);
        cfg.validate()?;
        self.register_strategy(HostingConfig::LocalDotNet(cfg))?;
        Ok(self)
    }

    /// Register a Node.js application launched via a package-manager script.
    pub fn use_local_node(mut self, configure: impl FnOnce(&mut LocalNodeOptions)) -> Result<Self> {
        let mut cfg = LocalNodeOptions::default();
        configure(&mut cfg);
        cfg.validate()?;
        self.register_strategy(HostingConfig::LocalNode(cfg))?;
        Ok(self)
    }

    /// Register a distributed-test-host application constructed in-process.
    pub fn use_distributed_host(
        mut self,
        configure: impl FnOnce(&mut DistributedTestHostOptions),
    ) -> Result<Self> {
        let mut cfg = DistributedTestHostOptions::default();
        configure(&mut cfg);
        cfg.validate()?;
        self.register_strategy(HostingConfig::DistributedTestHost(cfg))?;
        Ok(self)
    }

    /// Resolve deferred defaults and construct the runnable application.
    ///
    /// Fails if `default_wait_timeout` is zero or no hosting strategy was
    /// registered. Warns (does not fail) if `environment_name ==
    /// "Production"`: see DESIGN.md for the rationale behind choosing a
    /// warning over a hard failure.
    pub fn build(mut self) -> Result<crate::App> {
        if self.options.default_wait_timeout.is_zero() {
            return Err(Error::InvalidConfiguration(
                "default_wait_timeout must be greater than zero".to_string(),
            ));
        }

        if self.options.environment_name == "Production" {
            log::warn!(
                "options.production_environment_warning environment_name=Production — \
                 running the harness core against a production configuration is almost \
                 certainly a mistake"
            );
        }

        if self.options.headless_mode == HeadlessMode::Auto {
            self.options.headless_mode = if debugger_attached() {
                HeadlessMode::Off
            } else {
                HeadlessMode::On
            };
        }

        let hosting_config = self.hosting.ok_or_else(|| {
            Error::InvalidConfiguration(
                "no hosting strategy registered; call one of the use_* methods".to_string(),
            )
        })?;

        let strategy: Box<dyn HostingStrategy> =
            crate::hosting::dispatch::build_strategy(hosting_config, &self.options)?;

        Ok(crate::App::new(self.options, strategy, self.driver_factory))
    }
}
