//! Core types and shared functionality for ogserver.
//!
//! This crate provides:
//! - Artifact store with SQLite backend
//! - Request/origin cache-key derivation
//! - Per-key mutex registry
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod keylock;
pub mod urlkey;

pub use cache::{ImageDb, ImageRow};
pub use config::{AppConfig, ConfigError, ImageFormat, ImageOptions};
pub use error::Error;
pub use keylock::KeyLocks;
pub use urlkey::{UrlError, ValidatedUrl};
