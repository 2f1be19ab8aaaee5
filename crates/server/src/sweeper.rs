//! Hourly background maintenance.
//!
//! One task expires old artifact rows (and their files) and reaps idle
//! per-key mutexes. Sweep failures are logged and never take the service
//! down.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use ogserver_core::{ImageDb, KeyLocks};

/// One hour plus a second, so a "1 hour" cache window is already past due at
/// every tick instead of racing it.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3601);

/// Spawn the sweeper. The handle is detached for the life of the process.
pub fn spawn(store: ImageDb, keylocks: Arc<KeyLocks>, window: String) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        // the first tick completes immediately; skip it so startup doesn't
        // double as a sweep
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.expire(&window).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "expired cached images"),
                Err(e) => tracing::warn!(error = %e, "image expiry sweep failed"),
            }
            keylocks.sweep(Instant::now()).await;
        }
    })
}
