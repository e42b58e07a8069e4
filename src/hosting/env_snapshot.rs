//! Process-global environment snapshot/restore with cross-test mutual
//! exclusion (C4).
//!
//! Only the `DistributedTestHost` strategy mutates process-wide env, but it
//! does so on the process that the whole test binary shares, so every
//! `apply`/`restore` window in the binary must go through the same mutex.

use std::collections::HashMap;
use std::sync::OnceLock;

use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

fn global_mutex() -> &'static Mutex<()> {
    static MUTEX: OnceLock<Mutex<()>> = OnceLock::new();
    MUTEX.get_or_init(|| Mutex::new(()))
}

/// One entry of a captured env snapshot: a key and what it held before
/// mutation, or `None` if it was unset.
#[derive(Debug, Clone)]
struct SnapshotEntry {
    key: String,
    prior_value: Option<String>,
}

/// Holds the process-wide mutex guard plus the state needed to restore the
/// environment exactly once. Dropping this without calling `restore` is a
/// logic error in this crate (every call site restores under an async
/// equivalent of `try/finally`), but is still safe: the mutex is simply
/// released with the mutation left in place.
pub struct EnvSnapshotGuard<'a> {
    _guard: MutexGuard<'a, ()>,
    entries: Vec<SnapshotEntry>,
    restored: bool,
}

/// Acquire the process-wide env mutex (cancellably) and apply `vars`,
/// snapshotting whatever they overwrite.
///
/// `cancel` lets an in-flight acquisition be aborted promptly; once the
/// mutex is held, application of `vars` itself is synchronous and does not
/// honor cancellation (it cannot safely be interrupted mid-mutation).
pub(crate) async fn apply(
    vars: &HashMap<String, String>,
    cancel: &CancellationToken,
) -> Result<EnvSnapshotGuard<'static>> {
    let guard = tokio::select! {
        g = global_mutex().lock() => g,
        _ = cancel.cancelled() => {
            return Err(Error::StartupFailed(
                "env snapshot acquisition cancelled".to_string(),
            ));
        }
    };

    let mut entries = Vec::with_capacity(vars.len());
    for (key, value) in vars {
        let prior_value = std::env::var(key).ok();
        entries.push(SnapshotEntry {
            key: key.clone(),
            prior_value,
        });
        std::env::set_var(key, value);
    }

    Ok(EnvSnapshotGuard {
        _guard: guard,
        entries,
        restored: false,
    })
}

impl<'a> EnvSnapshotGuard<'a> {
    /// Restore every captured key to its prior state. Idempotent: calling
    /// this more than once is a no-op after the first call.
    pub(crate) fn restore(&mut self) {
        if self.restored {
            return;
        }
        for entry in &self.entries {
            match &entry.prior_value {
                Some(value) => std::env::set_var(&entry.key, value),
                None => std::env::remove_var(&entry.key),
            }
        }
        self.restored = true;
    }
}

impl<'a> Drop for EnvSnapshotGuard<'a> {
    fn drop(&mut self) {
        self.restore();
    }
}
