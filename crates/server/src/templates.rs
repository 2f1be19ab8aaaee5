//! Ephemeral static file server for template rendering.
//!
//! A template render navigates the browser to a locally served copy of the
//! template directory rather than the origin. The server binds a random
//! loopback port for the duration of one render and is torn down with the
//! response.

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;

/// A template is valid iff a directory by that name exists under the
/// templates directory. Matching against directory entries (rather than
/// joining the name onto the path) keeps traversal sequences inert.
pub fn is_valid(template_dir: &Path, name: &str) -> bool {
    let Ok(mut entries) = std::fs::read_dir(template_dir) else {
        return false;
    };
    entries.any(|entry| {
        entry
            .ok()
            .map(|e| e.file_name() == name && e.path().is_dir())
            .unwrap_or(false)
    })
}

/// Handle to a running template server.
pub struct TemplateServer {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl TemplateServer {
    /// Serve `root` on a random loopback port.
    ///
    /// Returns the handle and the base URL (`http://127.0.0.1:<port>`).
    pub async fn spawn(root: PathBuf) -> std::io::Result<(Self, String)> {
        let listener = tokio::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await?;
        let addr = listener.local_addr()?;

        let app = Router::new().fallback_service(ServeDir::new(root));
        let (shutdown, rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!(error = %e, "template server failed");
            }
        });

        tracing::debug!(%addr, "template server started");
        Ok((Self { shutdown, task }, format!("http://{addr}")))
    }

    /// Stop accepting and wait for the server to quiesce.
    pub async fn close(self) {
        let _ = self.shutdown.send(());
        if let Err(e) = self.task.await {
            tracing::debug!(error = %e, "template server join failed");
        }
    }
}
