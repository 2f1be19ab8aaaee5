//! Artifact row operations.
//!
//! Provides put/get/expire over the `images` table. The table is the source
//! of truth for which files under the image directory are live; every write
//! path here keeps the row and the file in step.

use super::connection::ImageDb;
use crate::Error;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// One artifact: a rendered image file plus its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRow {
    /// Normalized origin URL.
    pub key: String,
    /// File name relative to the image directory.
    pub file: String,
    /// SQLite timestamp, set by the database.
    pub created_at: String,
    /// Fingerprint of the rendering intent the artifact was produced for.
    pub cache_key: String,
}

impl ImageDb {
    /// Insert or replace the artifact for a key.
    ///
    /// When a row already exists its `file` and `cache_key` are updated (and
    /// `created_at` refreshed, so regeneration restarts the retention clock),
    /// then the previously referenced file is removed from disk. File removal
    /// is best-effort; only persistence errors fail the call.
    pub async fn put(&self, key: &str, file: &str, cache_key: &str) -> Result<(), Error> {
        let (row_key, row_file, row_cache_key) = (key.to_string(), file.to_string(), cache_key.to_string());
        let previous = self
            .conn
            .call(move |conn| -> Result<Option<String>, Error> {
                let previous = match conn.query_row(
                    "SELECT file FROM images WHERE key = ?1",
                    params![row_key],
                    |row| row.get::<_, String>(0),
                ) {
                    Ok(file) => Some(file),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                };

                conn.execute(
                    "INSERT INTO images (key, file, cache_key) VALUES (?1, ?2, ?3)
                     ON CONFLICT(key) DO UPDATE SET
                        file = excluded.file,
                        cache_key = excluded.cache_key,
                        created_at = CURRENT_TIMESTAMP",
                    params![row_key, row_file, row_cache_key],
                )?;

                Ok(previous)
            })
            .await
            .map_err(Error::from)?;

        if let Some(previous) = previous
            && previous != file
        {
            let path = self.image_dir.join(&previous);
            if let Err(e) = tokio::fs::remove_file(&path).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                tracing::warn!(file = %path.display(), error = %e, "failed to remove replaced artifact");
            }
        }

        Ok(())
    }

    /// Get the artifact row for a key.
    ///
    /// Returns None if the key has no artifact; that is not an error.
    pub async fn get(&self, key: &str) -> Result<Option<ImageRow>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<ImageRow>, Error> {
                let result = conn.query_row(
                    "SELECT key, file, created_at, cache_key FROM images WHERE key = ?1",
                    params![key],
                    |row| {
                        Ok(ImageRow {
                            key: row.get(0)?,
                            file: row.get(1)?,
                            created_at: row.get(2)?,
                            cache_key: row.get(3)?,
                        })
                    },
                );

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete artifacts older than the retention window.
    ///
    /// `window` is a SQLite relative-time string such as "30 days"; rows with
    /// `created_at < DATETIME('now', '-window')` are expired. Referenced
    /// files are removed first (already-missing files are tolerated, other
    /// I/O errors abort the sweep), then the rows are deleted. Returns the
    /// number of deleted rows.
    pub async fn expire(&self, window: &str) -> Result<u64, Error> {
        let modifier = format!("-{window}");

        let files = {
            let modifier = modifier.clone();
            self.conn
                .call(move |conn| -> Result<Vec<String>, Error> {
                    let mut stmt = conn.prepare(
                        "SELECT file FROM images WHERE created_at < DATETIME('now', ?1)",
                    )?;
                    let files = stmt
                        .query_map(params![modifier], |row| row.get::<_, String>(0))?
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok(files)
                })
                .await
                .map_err(Error::from)?
        };

        for file in &files {
            let path = self.image_dir.join(file);
            if let Err(e) = tokio::fs::remove_file(&path).await
                && e.kind() != std::io::ErrorKind::NotFound
            {
                return Err(Error::Io(e));
            }
        }

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute(
                    "DELETE FROM images WHERE created_at < DATETIME('now', ?1)",
                    params![modifier],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn open_with_dir() -> (tempfile::TempDir, ImageDb) {
        let dir = tempfile::tempdir().unwrap();
        let db = ImageDb::open_in_memory(dir.path()).await.unwrap();
        (dir, db)
    }

    fn touch(dir: &tempfile::TempDir, name: &str) {
        std::fs::write(dir.path().join(name), b"fake image bytes").unwrap();
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_dir, db) = open_with_dir().await;

        db.put("https://example.com", "a.jpg", "url=https%3A%2F%2Fexample.com")
            .await
            .unwrap();

        let row = db.get("https://example.com").await.unwrap().unwrap();
        assert_eq!(row.key, "https://example.com");
        assert_eq!(row.file, "a.jpg");
        assert_eq!(row.cache_key, "url=https%3A%2F%2Fexample.com");
        assert!(!row.created_at.is_empty());
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (_dir, db) = open_with_dir().await;
        let result = db.get("https://nowhere.example").await.unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_and_deletes_old_file() {
        let (dir, db) = open_with_dir().await;
        touch(&dir, "old.jpg");
        touch(&dir, "new.jpg");

        db.put("https://example.com", "old.jpg", "k1").await.unwrap();
        db.put("https://example.com", "new.jpg", "k2").await.unwrap();

        let row = db.get("https://example.com").await.unwrap().unwrap();
        assert_eq!(row.file, "new.jpg");
        assert_eq!(row.cache_key, "k2");

        assert!(!dir.path().join("old.jpg").exists());
        assert!(dir.path().join("new.jpg").exists());
    }

    #[tokio::test]
    async fn test_put_missing_old_file_is_tolerated() {
        let (dir, db) = open_with_dir().await;
        touch(&dir, "new.jpg");

        db.put("https://example.com", "gone.jpg", "k1").await.unwrap();
        db.put("https://example.com", "new.jpg", "k2").await.unwrap();

        let row = db.get("https://example.com").await.unwrap().unwrap();
        assert_eq!(row.file, "new.jpg");
    }

    #[tokio::test]
    async fn test_expire_nothing_fresh() {
        let (dir, db) = open_with_dir().await;
        touch(&dir, "a.jpg");
        db.put("https://example.com", "a.jpg", "").await.unwrap();

        let deleted = db.expire("30 days").await.unwrap();
        assert_eq!(deleted, 0);
        assert!(dir.path().join("a.jpg").exists());
        assert!(db.get("https://example.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_expire_removes_rows_and_files() {
        let (dir, db) = open_with_dir().await;
        touch(&dir, "a.jpg");
        touch(&dir, "b.jpg");
        db.put("https://one.example", "a.jpg", "").await.unwrap();
        db.put("https://two.example", "b.jpg", "").await.unwrap();

        // age the rows past any window
        db.conn
            .call(|conn| {
                conn.execute("UPDATE images SET created_at = DATETIME('now', '-1 year')", [])
            })
            .await
            .unwrap();

        let deleted = db.expire("1 second").await.unwrap();
        assert_eq!(deleted, 2);
        assert!(!dir.path().join("a.jpg").exists());
        assert!(!dir.path().join("b.jpg").exists());
        assert!(db.get("https://one.example").await.unwrap().is_none());
        assert!(db.get("https://two.example").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expire_tolerates_missing_files() {
        let (_dir, db) = open_with_dir().await;
        db.put("https://one.example", "never-written.jpg", "").await.unwrap();

        db.conn
            .call(|conn| {
                conn.execute("UPDATE images SET created_at = DATETIME('now', '-1 year')", [])
            })
            .await
            .unwrap();

        let deleted = db.expire("1 second").await.unwrap();
        assert_eq!(deleted, 1);
    }
}
