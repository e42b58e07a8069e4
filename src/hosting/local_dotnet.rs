//! The `LocalDotNet` hosting strategy: launches `dotnet run` for the
//! configured project and waits for it to become ready.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::dispatch::LocalDotNetOptions;
use super::launch_plan::{default_redacted_env_keys, LaunchPlan, ReadinessProbeKind};
use super::launcher::{ChildHandle, ProcessLauncher};
use super::{merge_strategy_defaults_then_user, HostingResult, HostingStrategy};
use crate::options::Options;
use crate::Result;

pub(crate) struct LocalDotNetStrategy {
    cfg: LocalDotNetOptions,
    options: Options,
    handle: Option<ChildHandle>,
    configuration_hash: String,
}

impl LocalDotNetStrategy {
    pub(crate) fn new(cfg: LocalDotNetOptions, options: Options) -> Self {
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

/// Construct the `LaunchPlan` a `LocalDotNet` strategy would start. A free
/// function (rather than a method only reachable through `start()`) so the
/// plan — and therefore `configuration_hash` — can be inspected without
/// spawning `dotnet`. Every field of `LocalDotNetOptions` is public, so this
/// returns `Result` rather than panicking on a caller-constructed options
/// value that never went through `OptionsBuilder`'s validation gate.
pub fn build_launch_plan(cfg: &LocalDotNetOptions, options: &Options) -> Result<LaunchPlan> {
    let base_url = cfg
        .base_url
        .clone()
        .ok_or_else(|| crate::Error::InvalidConfiguration("base_url is not set".to_string()))?;

    let hosting_startup_assemblies = if options.spa_proxy_enabled {
        "Microsoft.AspNetCore.SpaProxy"
    } else {
        ""
    };

    let mut env = std::collections::HashMap::new();
    env.insert(
        "ASPNETCORE_ENVIRONMENT".to_string(),
        options.environment_name.clone(),
    );
    env.insert(
        "DOTNET_ENVIRONMENT".to_string(),
        options.environment_name.clone(),
    );
    env.insert(
        "ASPNETCORE_HOSTINGSTARTUPASSEMBLIES".to_string(),
        hosting_startup_assemblies.to_string(),
    );
    let env = merge_strategy_defaults_then_user(env, options);

    Ok(LaunchPlan {
        executable: "dotnet".to_string(),
        arguments: vec![
            "run".to_string(),
            "--project".to_string(),
            cfg.project_path.clone(),
            "--framework".to_string(),
            cfg.framework.clone(),
            "--configuration".to_string(),
            cfg.configuration.clone(),
            "--urls".to_string(),
            base_url.to_string(),
            "--no-launch-profile".to_string(),
        ],
        working_directory: cfg.working_directory.clone(),
        environment: env,
        base_url,
        startup_timeout: cfg.startup_timeout,
        health_check_endpoints: cfg.health_check_endpoints.clone(),
        readiness_probe_kind: ReadinessProbeKind::Http,
        initial_delay: std::time::Duration::from_secs(2),
        poll_interval: std::time::Duration::from_millis(200),
        stream_output: cfg.stream_process_output,
        redacted_env_keys: default_redacted_env_keys(),
        process_name: cfg.process_name.clone(),
    })
}

#[async_trait]
impl HostingStrategy for LocalDotNetStrategy {
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
