//! Database connection management with pragma configuration.
//!
//! This module handles opening the SQLite database, applying required pragmas
//! for performance and concurrency (WAL mode), and running migrations.

use super::migrations;
use crate::Error;
use std::path::{Path, PathBuf};
use tokio_rusqlite::Connection;

/// Artifact database handle.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread, plus the image directory the rows refer into.
#[derive(Clone, Debug)]
pub struct ImageDb {
    pub(crate) conn: Connection,
    pub(crate) image_dir: PathBuf,
}

impl ImageDb {
    /// Open a database at the specified path.
    ///
    /// Creates the file if it doesn't exist, applies performance pragmas,
    /// and runs any pending migrations. `image_dir` is where artifact files
    /// referenced by rows live; replace and expire operations delete files
    /// from it.
    pub async fn open(path: impl AsRef<Path>, image_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, image_dir: image_dir.into() })
    }

    /// Open an in-memory database for testing.
    pub async fn open_in_memory(image_dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;

        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, image_dir: image_dir.into() })
    }

    /// Directory that artifact rows refer into.
    pub fn image_dir(&self) -> &Path {
        &self.image_dir
    }
}
