//! The `LocalNode` hosting strategy: launches a package-manager script for
//! a Node.js application and waits for it to become ready.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::dispatch::LocalNodeOptions;
use super::launch_plan::{default_redacted_env_keys, LaunchPlan, ReadinessProbeKind};
use super::launcher::{ChildHandle, ProcessLauncher};
use super::{merge_strategy_defaults_then_user, HostingResult, HostingStrategy};
use crate::options::Options;
use crate::Result;

/// `"Testing" → "test"`; otherwise the lowercased identity, per the
/// environment-name-to-NODE_ENV mapping contract.
fn node_env_for(environment_name: &str) -> String {
    if environment_name == "Testing" {
        "test".to_string()
    } else {
        environment_name.to_lowercase()
    }
}

pub(crate) struct LocalNodeStrategy {
    cfg: LocalNodeOptions,
    options: Options,
    handle: Option<ChildHandle>,
    configuration_hash: String,
}

impl LocalNodeStrategy {
    pub(crate) fn new(cfg: LocalNodeOptions, options: Options) -> Self {
        Self {
            cfg,
            options,
            handle: None,
            configuration_hash: String::new(),
        }
    }

    fn build_plan(&self) -> Result<LaunchPlan> {
        build_launch_plan(&self.cfg, &self.options)
    }
}

/// Construct the `LaunchPlan` a `LocalNode` strategy would start — see
/// [`super::local_dotnet::build_launch_plan`] for why this is public and
/// fallible.
pub fn build_launch_plan(cfg: &LocalNodeOptions, options: &Options) -> Result<LaunchPlan> {
    let base_url = cfg
        .base_url
        .clone()
        .ok_or_else(|| crate::Error::InvalidConfiguration("base_url is not set".to_string()))?;
    let port = base_url
        .port_or_known_default()
        .map(|p| p.to_string())
        .unwrap_or_default();

    let mut env = std::collections::HashMap::new();
    env.insert(
        "NODE_ENV".to_string(),
        node_env_for(&options.environment_name),
    );
    env.insert("PORT".to_string(), port);
    let env = merge_strategy_defaults_then_user(env, options);

    Ok(LaunchPlan {
        executable: "npm".to_string(),
        arguments: vec!["run".to_string(), cfg.script.clone()],
        working_directory: cfg
            .working_directory
            .clone()
            .or_else(|| Some(std::path::PathBuf::from(&cfg.project_path))),
        environment: env,
        base_url,
        startup_timeout: cfg.startup_timeout,
        health_check_endpoints: cfg.health_check_endpoints.clone(),
        readiness_probe_kind: ReadinessProbeKind::Http,
        initial_delay: std::time::Duration::from_secs(2),
        poll_interval: std::time::Duration::from_millis(200),
        stream_output: cfg.stream_process_output,
        redacted_env_keys: default_redacted_env_keys(),
        process_name: None,
    })
}

#[async_trait]
impl HostingStrategy for LocalNodeStrategy {
    async fn start(&mut self) -> Result<HostingResult> {
        let plan = self.build_plan()?;
        let cancel = CancellationToken::new();
        let launcher = ProcessLauncher::new(plan);
        let (result, handle) = launcher.start(cancel).await?;
        self.configuration_hash = handle.configuration_hash().to_string();
        self.handle = Some(handle);
        Ok(result)
    }

    fn configuration_hash(&self) -> String {
        self.configuration_hash.clone()
    }

    async fn dispose(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            ProcessLauncher::dispose(handle).await?;
        }
        Ok(())
    }
}
