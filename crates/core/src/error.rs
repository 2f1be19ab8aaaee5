//! Unified error types for ogserver.

use tokio_rusqlite::rusqlite;

/// Unified error types shared by the ogserver crates.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Browser process could not be launched or connected to.
    #[error("browser launch failed: {0}")]
    BrowserLaunch(String),

    /// Navigation inside a tab failed.
    #[error("navigation failed: {0}")]
    Navigation(String),

    /// Screenshot capture failed.
    #[error("screenshot capture failed: {0}")]
    Capture(String),

    /// Database operation failed.
    #[error("database error: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("migration failed: {0}")]
    MigrationFailed(String),

    /// HTTP client could not be constructed.
    #[error("http client error: {0}")]
    HttpClient(String),

    /// File system operation failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Navigation("net::ERR_CONNECTION_REFUSED".to_string());
        assert!(err.to_string().contains("navigation failed"));
        assert!(err.to_string().contains("ERR_CONNECTION_REFUSED"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }
}
