//! Strategy-specific configuration and the tagged variant the builder
//! accumulates before dispatching to a concrete [`super::HostingStrategy`].

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::options::Options;
use crate::{Error, Result};

use super::distributed::DistributedTestHostStrategy;
use super::external::ExternalStrategy;
use super::local_dotnet::LocalDotNetStrategy;
use super::local_node::LocalNodeStrategy;
use super::HostingStrategy;

fn default_health_check_endpoints() -> Vec<String> {
    vec!["/".to_string()]
}

/// Configuration for the `LocalDotNet` hosting strategy.
#[derive(Debug, Clone)]
pub struct LocalDotNetOptions {
    pub project_path: String,
    pub base_url: Option<Url>,
    pub framework: String,
    pub configuration: String,
    pub startup_timeout: Duration,
    pub health_check_endpoints: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub process_name: Option<String>,
    pub stream_process_output: bool,
}

impl Default for LocalDotNetOptions {
    fn default() -> Self {
        Self {
            project_path: String::new(),
            base_url: None,
            framework: "net8.0".to_string(),
            configuration: "Release".to_string(),
            startup_timeout: Duration::from_secs(60),
            health_check_endpoints: default_health_check_endpoints(),
            working_directory: None,
            process_name: None,
            stream_process_output: true,
        }
    }
}

impl LocalDotNetOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.project_path.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "LocalDotNet.project_path must not be empty".to_string(),
            ));
        }
        if self.base_url.is_none() {
            return Err(Error::InvalidConfiguration(
                "LocalDotNet.base_url must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the `LocalNode` hosting strategy.
#[derive(Debug, Clone)]
pub struct LocalNodeOptions {
    pub project_path: String,
    pub base_url: Option<Url>,
    pub script: String,
    pub startup_timeout: Duration,
    pub health_check_endpoints: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub stream_process_output: bool,
}

impl Default for LocalNodeOptions {
    fn default() -> Self {
        Self {
            project_path: String::new(),
            base_url: None,
            script: "start".to_string(),
            startup_timeout: Duration::from_secs(60),
            health_check_endpoints: default_health_check_endpoints(),
            working_directory: None,
            stream_process_output: true,
        }
    }
}

impl LocalNodeOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.project_path.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "LocalNode.project_path must not be empty".to_string(),
            ));
        }
        if self.base_url.is_none() {
            return Err(Error::InvalidConfiguration(
                "LocalNode.base_url must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration for the `DistributedTestHost` strategy. A superset of the
/// local-process options, minus anything that implies spawning a child
/// process: this strategy mutates the *current* process's environment and
/// expects the caller's application factory to read it during construction.
#[derive(Debug, Clone)]
pub struct DistributedTestHostOptions {
    pub entry_point_reference: String,
    pub base_url: Option<Url>,
    pub startup_timeout: Duration,
    pub health_check_endpoints: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub process_name: Option<String>,
    pub stream_process_output: bool,
}

impl Default for DistributedTestHostOptions {
    fn default() -> Self {
        Self {
            entry_point_reference: String::new(),
            base_url: None,
            startup_timeout: Duration::from_secs(60),
            health_check_endpoints: default_health_check_endpoints(),
            working_directory: None,
            process_name: None,
            stream_process_output: true,
        }
    }
}

impl DistributedTestHostOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.entry_point_reference.trim().is_empty() {
            return Err(Error::InvalidConfiguration(
                "DistributedTestHost.entry_point_reference must not be empty".to_string(),
            ));
        }
        if self.base_url.is_none() {
            return Err(Error::InvalidConfiguration(
                "DistributedTestHost.base_url must be set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tagged variant of exactly one registered hosting strategy.
#[derive(Debug, Clone)]
pub enum HostingConfig {
    External {
        base_url: Url,
    },
    LocalDotNet(LocalDotNetOptions),
    LocalNode(LocalNodeOptions),
    DistributedTestHost(DistributedTestHostOptions),
}

/// Construct the concrete strategy object for a registered configuration.
pub(crate) fn build_strategy(
    config: HostingConfig,
    options: &Options,
) -> Result<Box<dyn HostingStrategy>> {
    Ok(match config {
        HostingConfig::External { base_url } => Box::new(ExternalStrategy::new(base_url)),
        HostingConfig::LocalDotNet(cfg) => {
            Box::new(LocalDotNetStrategy::new(cfg, options.clone()))
        }
        HostingConfig::LocalNode(cfg) => Box::new(LocalNodeStrategy::new(cfg, options.clone())),
        HostingConfig::DistributedTestHost(cfg) => {
            Box::new(DistributedTestHostStrategy::new(cfg, options.clone()))
        }
    })
}
