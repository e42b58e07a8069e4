//! The `External` hosting strategy: no process is owned, `start` is a
//! no-op that returns the configured URL.

use async_trait::async_trait;
use url::Url;

use super::{HostingResult, HostingStrategy};
use crate::Result;

pub(crate) struct ExternalStrategy {
    base_url: Url,
    started: bool,
}

impl ExternalStrategy {
    pub(crate) fn new(base_url: Url) -> Self {
        Self {
            base_url,
            started: false,
        }
    }
}

#[async_trait]
impl HostingStrategy for ExternalStrategy {
    async fn start(&mut self) -> Result<HostingResult> {
        log::info!("hosting.external_attached base_url={}", self.base_url);
        self.started = true;
        Ok(HostingResult {
            base_url: self.base_url.clone(),
        })
    }

    fn configuration_hash(&self) -> String {
        if !self.started {
            return String::new();
        }
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"external\0");
        hasher.update(self.base_url.as_str().as_bytes());
        hex::encode(hasher.finalize())
    }

    async fn dispose(&mut self) -> Result<()> {
        Ok(())
    }
}
