//! Immutable, deterministic description of a child-process launch (C3).

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use sha2::{Digest, Sha256};
use url::Url;

/// How the launcher decides whether the child is ready to serve traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessProbeKind {
    Http,
}

/// A fully materialized launch configuration. Nothing about a `LaunchPlan`
/// depends on a later call — every member is fixed at construction time.
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub executable: String,
    pub arguments: Vec<String>,
    pub working_directory: Option<PathBuf>,
    pub environment: HashMap<String, String>,
    pub base_url: Url,
    pub startup_timeout: Duration,
    pub health_check_endpoints: Vec<String>,
    pub readiness_probe_kind: ReadinessProbeKind,
    pub initial_delay: Duration,
    pub poll_interval: Duration,
    pub stream_output: bool,
    pub redacted_env_keys: Vec<String>,
    /// Substring match against a process image name for port-reclaim
    /// conservatism. `None` disables port reclaim entirely.
    pub process_name: Option<String>,
}

/// Env keys redacted from debug logs unless the caller widens the set.
pub fn default_redacted_env_keys() -> Vec<String> {
    vec![
        "CONNECTIONSTRINGS__DEFAULTCONNECTION".to_string(),
        "API_KEY".to_string(),
        "SECRET".to_string(),
        "TOKEN".to_string(),
        "PASSWORD".to_string(),
    ]
}

impl LaunchPlan {
    /// Whether `key` should be redacted before it is logged, per
    /// `redacted_env_keys`. Case-insensitive substring match — callers list
    /// fragments like `"SECRET"` or `"PASSWORD"` rather than every exact
    /// variable name a project might use.
    pub fn is_redacted_env_key(&self, key: &str) -> bool {
        let key = key.to_ascii_uppercase();
        self.redacted_env_keys
            .iter()
            .any(|redacted| key.contains(&redacted.to_ascii_uppercase()))
    }

    /// Join `base_url` with a health-check endpoint path. Endpoints not
    /// beginning with "/" are concatenated directly rather than joined, so
    /// `https://h/app` + `status` yields `https://h/appstatus`, matching a
    /// path-relative (not root-relative) join.
    pub fn probe_url(&self, endpoint: &str) -> Url {
        if endpoint.starts_with('/') {
            let mut url = self.base_url.clone();
            let joined = format!(
                "{}{}",
                self.base_url.path().trim_end_matches('/'),
                endpoint
            );
            url.set_path(&joined);
            url
        } else {
            let mut text = self.base_url.to_string();
            text.push_str(endpoint);
            Url::parse(&text).unwrap_or_else(|_| self.base_url.clone())
        }
    }

    /// A stable digest over (executable, canonically-sorted arguments and
    /// env, base_url, endpoints, timeouts). Argument order is part of the
    /// identity (two plans with the same args in a different order are NOT
    /// logically identical), but env map ordering never is, since
    /// `HashMap` iteration order is not meaningful.
    pub fn configuration_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.executable.as_bytes());
        hasher.update(b"\0");
        for arg in &self.arguments {
            hasher.update(arg.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"\0");

        let sorted_env: BTreeMap<&String, &String> = self.environment.iter().collect();
        for (k, v) in sorted_env {
            hasher.update(k.as_bytes());
            hasher.update(b"=");
            hasher.update(v.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(b"\0");

        hasher.update(self.base_url.as_str().as_bytes());
        hasher.update(b"\0");
        for endpoint in &self.health_check_endpoints {
            hasher.update(endpoint.as_bytes());
            hasher.update(b"\0");
        }
        hasher.update(self.startup_timeout.as_millis().to_le_bytes());

        hex::encode(hasher.finalize())
    }
}
