//! ogserver entry point.
//!
//! Boots configuration, the artifact store and the browser pool, then serves
//! the HTTP surface until SIGINT/SIGTERM. Logging goes to stderr.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use ogserver_client::{BrowserPool, PoolConfig, Probe};
use ogserver_core::{AppConfig, ImageDb};
use ogserver_server::{AppState, create_router, sweeper};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        data_dir = %config.data_dir.display(),
        port = config.port,
        cache_time = %config.cache_time,
        max_tabs = config.max_tabs,
        "configuration loaded"
    );

    for dir in [config.db_dir(), config.image_dir(), config.template_dir()] {
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }

    let store = ImageDb::open(config.db_path(), config.image_dir())
        .await
        .context("failed to open database")?;
    tracing::info!(db = %config.db_path().display(), "database initialized");

    let pool = BrowserPool::new(PoolConfig {
        max_tabs: config.max_tabs,
        idle_after: config.persist_duration(),
        remote_url: config.remote_url.clone(),
        font_family: config.font_family.clone(),
    });
    let probe = Probe::new().context("failed to build probe client")?;

    let state = AppState::new(config.clone(), store, pool.clone(), probe);

    let _sweeper = sweeper::spawn(state.store.clone(), state.keylocks.clone(), config.cache_time.clone());

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;
    tracing::info!("listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install sigterm handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
