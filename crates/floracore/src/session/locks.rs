//! Per-session mutual exclusion.
//!
//! Two concurrent messages from the same (tenant, user) must not interleave
//! their read-modify-write cycles against the session store, so each key gets
//! its own async mutex and a whole turn runs under the owned guard. Different
//! keys never contend. The guard is released on drop, which covers every exit
//! path: success, handled error, panic unwind, and task cancellation.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::SessionKey;

/// Lock table keyed by session.
#[derive(Default)]
pub struct SessionLocks {
    locks: DashMap<SessionKey, Arc<Mutex<()>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the turn lock for `key`, waiting behind any in-flight turn
    /// for the same session.
    pub async fn acquire(&self, key: &SessionKey) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(*key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of keys currently tracked (idle entries included).
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Drops entries whose lock is not held by anyone. Called from the same
    /// scheduled task that sweeps stale sessions.
    pub fn prune_idle(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1 || lock.try_lock().is_err());
    }
}
