//! Per-key mutex registry.
//!
//! Queues mass simultaneous requests for the same origin URL so that at most
//! one render per key is in flight; everyone else observes the finished
//! artifact on their turn. The registry lock is held only long enough to look
//! up or insert an entry and stamp it; waiting on the per-key lock happens
//! after it is released, so distinct keys never serialize on the registry.
//!
//! Entries idle for more than a minute are reaped by the sweeper. Dropping a
//! mutex nobody holds is safe: the artifact table is the source of truth, the
//! mutex only prevents wasted duplicate renders.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Entries idle longer than this are dropped by [`KeyLocks::sweep`].
const MAX_IDLE: Duration = Duration::from_secs(60);

struct Entry {
    lock: Arc<Mutex<()>>,
    last_access: Instant,
}

/// Registry of per-key mutexes with time-based GC.
#[derive(Default)]
pub struct KeyLocks {
    entries: Mutex<HashMap<String, Entry>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the exclusive lock for a key, creating the entry on first use.
    ///
    /// The returned guard holds the key locked until dropped.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut entries = self.entries.lock().await;
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry { lock: Arc::new(Mutex::new(())), last_access: Instant::now() });
            entry.last_access = Instant::now();
            entry.lock.clone()
        };

        lock.lock_owned().await
    }

    /// Drop entries whose last access is more than a minute before `now`.
    pub async fn sweep(&self, now: Instant) {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.last_access) < MAX_IDLE);
        let reaped = before - entries.len();
        if reaped > 0 {
            tracing::debug!(reaped, remaining = entries.len(), "reaped idle url mutexes");
        }
    }

    /// Number of live entries, for tests and diagnostics.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}
