//! Hosting supervisor: strategy dispatch (C2), launch planning and process
//! supervision (C3), and the env-snapshot controller (C4).

pub mod dispatch;
pub mod distributed;
pub mod env_snapshot;
pub mod external;
pub mod launch_plan;
pub mod launcher;
pub mod local_dotnet;
pub mod local_node;

use async_trait::async_trait;
use url::Url;

use crate::options::Options;
use crate::Result;
pub use dispatch::HostingConfig;

/// The outcome of a successful `HostingStrategy::start`.
#[derive(Debug, Clone)]
pub struct HostingResult {
    pub base_url: Url,
}

/// Strategy-dispatched process launcher surface (C2). Exactly one
/// implementation is active per [`crate::App`].
#[async_trait]
pub trait HostingStrategy: Send + Sync {
    /// Bring the application up and return the URL it is reachable at.
    async fn start(&mut self) -> Result<HostingResult>;

    /// A stable digest identifying this logical launch configuration.
    /// Returns the empty string before `start` has completed.
    fn configuration_hash(&self) -> String;

    /// Tear down anything this strategy owns (child process, mutated
    /// process-global environment, ...). Idempotent.
    async fn dispose(&mut self) -> Result<()>;
}

pub(crate) fn merge_strategy_defaults_then_user(
    mut env: std::collections::HashMap<String, String>,
    options: &Options,
) -> std::collections::HashMap<String, String> {
    options.environment_variables.apply_onto(&mut env);
    env
}
