//! Browser pool: one long-lived browser, bounded tabs, idle reaper.
//!
//! Local mode spawns a Chromium process via chromiumoxide on first use and
//! keeps it alive while tabs are open. When the last tab closes, an idle
//! timer is armed; if no tab is acquired before it fires, the process is
//! terminated and the next acquire respawns it. Remote mode connects to an
//! external DevTools endpoint and does no lifecycle management.
//!
//! Concurrency contract: the tab semaphore bounds open tabs at `max_tabs`.
//! Spawn, tab creation, and the idle-shutdown path all run under the single
//! pool lock, so at most one local browser process exists at any instant and
//! a shutdown can never interleave with an acquire that is ensuring the
//! process. Timer cancellation is by generation: every acquire bumps the
//! generation, and a fired timer only closes the browser when the generation
//! it captured is still current.

use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures_util::StreamExt;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

use ogserver_core::Error;

/// Browser pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum concurrently open tabs.
    pub max_tabs: usize,

    /// How long the local browser survives with no open tabs.
    pub idle_after: Duration,

    /// DevTools websocket endpoint of a remote browser. When set, no local
    /// process is spawned or reaped.
    pub remote_url: Option<String>,

    /// System font family passed to the local browser.
    pub font_family: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { max_tabs: 5, idle_after: Duration::from_secs(300), remote_url: None, font_family: None }
    }
}

/// Shared handle to the browser pool.
#[derive(Clone)]
pub struct BrowserPool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    tabs: Arc<Semaphore>,
    state: Mutex<PoolState>,
}

#[derive(Default)]
struct PoolState {
    browser: Option<LiveBrowser>,
    /// Bumped on every acquire and shutdown; an armed idle timer is void
    /// once the generation moves past the one it captured.
    generation: u64,
}

struct LiveBrowser {
    browser: Browser,
    handler: JoinHandle<()>,
}

impl LiveBrowser {
    async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("browser close error: {e}");
        }
        if let Err(e) = self.browser.wait().await {
            tracing::debug!("browser wait error: {e}");
        }
        self.handler.abort();
    }
}

/// An open tab. Dropping it closes the page, frees the tab slot, and arms
/// the idle timer when it was the last one out.
pub struct Tab {
    page: Page,
    permit: Option<OwnedSemaphorePermit>,
    pool: BrowserPool,
}

impl Tab {
    pub fn page(&self) -> &Page {
        &self.page
    }
}

impl Drop for Tab {
    fn drop(&mut self) {
        let permit = self.permit.take();
        let page = self.page.clone();
        let pool = self.pool.clone();
        let _ = tokio::spawn(async move {
            page.close().await.ok();
            drop(permit);
            pool.note_release().await;
        });
    }
}

impl BrowserPool {
    pub fn new(config: PoolConfig) -> Self {
        let tabs = Arc::new(Semaphore::new(config.max_tabs));
        Self { inner: Arc::new(PoolInner { config, tabs, state: Mutex::new(PoolState::default()) }) }
    }

    /// Acquire a tab, blocking while `max_tabs` are already open.
    ///
    /// Ensures the browser is alive, spawning or connecting as needed.
    pub async fn acquire(&self) -> Result<Tab, Error> {
        let permit = self
            .inner
            .tabs
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::BrowserLaunch(e.to_string()))?;

        let mut state = self.inner.state.lock().await;
        state.generation = state.generation.wrapping_add(1);

        if state.browser.is_none() {
            state.browser = Some(self.launch().await?);
        }

        let opened = match state.browser.as_ref() {
            Some(live) => live.browser.new_page("about:blank").await,
            None => return Err(Error::BrowserLaunch("browser unavailable".into())),
        };

        let page = match opened {
            Ok(page) => page,
            Err(e) => {
                // the process likely died underneath us; clear it so the
                // next acquire respawns
                if let Some(dead) = state.browser.take() {
                    dead.shutdown().await;
                }
                return Err(Error::BrowserLaunch(format!("failed to open tab: {e}")));
            }
        };

        Ok(Tab { page, permit: Some(permit), pool: self.clone() })
    }

    /// Terminate the browser, if running. Called on server shutdown.
    pub async fn shutdown(&self) {
        let mut state = self.inner.state.lock().await;
        state.generation = state.generation.wrapping_add(1);
        if let Some(live) = state.browser.take() {
            tracing::debug!("terminating browser process");
            live.shutdown().await;
        }
    }

    /// Whether a browser is currently alive.
    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.browser.is_some()
    }

    async fn launch(&self) -> Result<LiveBrowser, Error> {
        let (browser, mut handler) = if let Some(remote) = &self.inner.config.remote_url {
            tracing::debug!(url = %remote, "connecting to remote browser");
            Browser::connect(remote.clone())
                .await
                .map_err(|e| Error::BrowserLaunch(e.to_string()))?
        } else {
            tracing::debug!("launching browser process");
            let mut builder = BrowserConfig::builder()
                .arg("--font-render-hinting=none")
                .arg("--disable-font-subpixel-positioning")
                .arg("--mute-audio");
            if let Some(font) = &self.inner.config.font_family {
                builder = builder.arg(format!("--system-font-family={font}"));
            }
            let config = builder.build().map_err(Error::BrowserLaunch)?;
            Browser::launch(config)
                .await
                .map_err(|e| Error::BrowserLaunch(e.to_string()))?
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {e}");
                    break;
                }
            }
        });

        Ok(LiveBrowser { browser, handler: handler_task })
    }

    /// Called after a tab slot is freed; arms the idle timer when the pool
    /// drained completely.
    async fn note_release(&self) {
        if self.inner.config.remote_url.is_some() {
            return;
        }

        let state = self.inner.state.lock().await;
        if state.browser.is_none() {
            return;
        }
        if self.inner.tabs.available_permits() < self.inner.config.max_tabs {
            return;
        }

        let generation = state.generation;
        drop(state);

        tracing::debug!(idle_after = ?self.inner.config.idle_after, "arming browser idle timer");
        let pool = self.clone();
        let idle_after = self.inner.config.idle_after;
        let _ = tokio::spawn(async move {
            tokio::time::sleep(idle_after).await;
            pool.close_if_idle(generation).await;
        });
    }

    async fn close_if_idle(&self, generation: u64) {
        let mut state = self.inner.state.lock().await;
        if state.generation != generation {
            // a tab was acquired since the timer was armed
            return;
        }
        if let Some(live) = state.browser.take() {
            tracing::debug!("terminating idle browser process");
            live.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_config_default() {
        let config = PoolConfig::default();
        assert_eq!(config.max_tabs, 5);
        assert_eq!(config.idle_after, Duration::from_secs(300));
        assert!(config.remote_url.is_none());
        assert!(config.font_family.is_none());
    }

    #[tokio::test]
    async fn test_pool_starts_idle() {
        let pool = BrowserPool::new(PoolConfig::default());
        assert!(!pool.is_running().await);
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_acquire_spawns_and_idle_timer_reaps() {
        let pool = BrowserPool::new(PoolConfig { idle_after: Duration::from_millis(300), ..Default::default() });

        let tab = pool.acquire().await.unwrap();
        assert!(pool.is_running().await);
        drop(tab);

        tokio::time::sleep(Duration::from_millis(900)).await;
        assert!(!pool.is_running().await);

        // next acquire respawns
        let _tab = pool.acquire().await.unwrap();
        assert!(pool.is_running().await);
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_acquire_cancels_armed_idle_timer() {
        let pool = BrowserPool::new(PoolConfig { idle_after: Duration::from_millis(300), ..Default::default() });

        drop(pool.acquire().await.unwrap());
        tokio::time::sleep(Duration::from_millis(100)).await;

        // re-acquire before the timer fires; the browser must survive the
        // original deadline while this tab is open
        let _tab = pool.acquire().await.unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(pool.is_running().await);
    }

    #[tokio::test]
    #[ignore = "requires Chrome/Chromium installation"]
    async fn test_tab_cap_blocks_acquire() {
        let pool = BrowserPool::new(PoolConfig { max_tabs: 1, ..Default::default() });

        let held = pool.acquire().await.unwrap();
        let blocked = tokio::time::timeout(Duration::from_millis(200), pool.acquire()).await;
        assert!(blocked.is_err(), "second acquire should block at the tab cap");

        drop(held);
        let unblocked = tokio::time::timeout(Duration::from_secs(5), pool.acquire()).await;
        assert!(unblocked.is_ok());
    }
}
