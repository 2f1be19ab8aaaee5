//! Application state shared across handlers.

use std::collections::HashSet;
use std::sync::Arc;

use ogserver_client::{BrowserPool, Probe};
use ogserver_core::{AppConfig, ImageDb, ImageOptions, KeyLocks};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Allowed-domain set derived from the configuration; empty permits all.
    pub allowed_domains: Arc<HashSet<String>>,
    /// Process-wide image encoding options.
    pub image_options: ImageOptions,
    /// Artifact store.
    pub store: ImageDb,
    /// Per-key mutex registry.
    pub keylocks: Arc<KeyLocks>,
    /// Browser pool.
    pub pool: BrowserPool,
    /// Origin probe client.
    pub probe: Arc<Probe>,
}

impl AppState {
    /// Assemble application state from its prebuilt parts.
    pub fn new(config: AppConfig, store: ImageDb, pool: BrowserPool, probe: Probe) -> Self {
        let allowed_domains = Arc::new(config.allowed_domain_set());
        let image_options = config.image_options();

        Self {
            config: Arc::new(config),
            allowed_domains,
            image_options,
            store,
            keylocks: Arc::new(KeyLocks::new()),
            pool,
            probe: Arc::new(probe),
        }
    }
}
