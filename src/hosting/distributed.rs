//! The `DistributedTestHost` strategy: mutates process-global environment
//! via the env-snapshot controller before spawning the distributed app
//! host's entry point, since the hosted factory reads env during its own
//! construction.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::dispatch::DistributedTestHostOptions;
use super::env_snapshot::{self, EnvSnapshotGuard};
use super::launch_plan::{default_redacted_env_keys, LaunchPlan, ReadinessProbeKind};
use super::launcher::{ChildHandle, ProcessLauncher};
use super::{merge_strategy_defaults_then_user, HostingResult, HostingStrategy};
use crate::options::Options;
use crate::Result;

pub(crate) struct DistributedTestHostStrategy {
    cfg: DistributedTestHostOptions,
    options: Options,
    handle: Option<ChildHandle>,
    env_guard: Option<EnvSnapshotGuard<'static>>,
    configuration_hash: String,
}

impl DistributedTestHostStrategy {
    pub(crate) fn new(cfg: DistributedTestHostOptions, options: Options) -> Self {
        Self {
            cfg,
            options,
            handle: None,
            env_guard: None,
            configuration_hash: String::new(),
        }
    }

    fn env_vars(&self) -> std::collections::HashMap<String, String> {
        distributed_env_vars(&self.options)
    }

    fn build_plan(&self, env: std::collections::HashMap<String, String>) -> Result<LaunchPlan> {
        build_launch_plan(&self.cfg, env)
    }
}

/// The env vars a `DistributedTestHost` strategy applies via the env-snapshot
/// controller before spawning, user overrides merged on top.
pub fn distributed_env_vars(options: &Options) -> std::collections::HashMap<String, String> {
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
    env.insert(
        "DOTNET_DASHBOARD_UNSECURED_ALLOW_ANONYMOUS".to_string(),
        "true".to_string(),
    );
    env.insert(
        "ASPIRE_ALLOW_UNSECURED_TRANSPORT".to_string(),
        "true".to_string(),
    );
    merge_strategy_defaults_then_user(env, options)
}

/// Construct the `LaunchPlan` a `DistributedTestHost` strategy would start,
/// given an already-computed env map — see
/// [`super::local_dotnet::build_launch_plan`] for why this is public and
/// fallible.
pub fn build_launch_plan(
    cfg: &DistributedTestHostOptions,
    env: std::collections::HashMap<String, String>,
) -> Result<LaunchPlan> {
    let base_url = cfg
        .base_url
        .clone()
        .ok_or_else(|| crate::Error::InvalidConfiguration("base_url is not set".to_string()))?;

    Ok(LaunchPlan {
        executable: "dotnet".to_string(),
        arguments: vec![
            "run".to_string(),
            "--project".to_string(),
            cfg.entry_point_reference.clone(),
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
impl HostingStrategy for DistributedTestHostStrategy {
    async fn start(&mut self) -> Result<HostingResult> {
        let env = self.env_vars();
        let cancel = CancellationToken::new();

        // The mutex acquisition+apply step is the env-snapshot controller's
        // job; everything after this point runs with the process env
        // mutated for the lifetime of `guard`.
        let mut guard = env_snapshot::apply(&env, &cancel).await?;

        let plan = match self.build_plan(env) {
            Ok(plan) => plan,
            Err(e) => {
                guard.restore();
                return Err(e);
            }
        };
        let launcher = ProcessLauncher::new(plan);
        match launcher.start(cancel).await {
            Ok((result, handle)) => {
                self.configuration_hash = handle.configuration_hash().to_string();
                self.handle = Some(handle);
                self.env_guard = Some(guard);
                Ok(result)
            }
            Err(e) => {
                // Restore immediately: a start failure must never leak
                // mutated env to the next test.
                guard.restore();
                Err(e)
            }
        }
    }

    fn configuration_hash(&self) -> String {
        self.configuration_hash.clone()
    }

    async fn dispose(&mut self) -> Result<()> {
        if let Some(handle) = self.handle.take() {
            ProcessLauncher::dispose(handle).await?;
        }
        if let Some(mut guard) = self.env_guard.take() {
            guard.restore();
        }
        Ok(())
    }
}
