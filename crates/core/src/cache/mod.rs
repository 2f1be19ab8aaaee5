//! SQLite-backed artifact store for rendered social images.
//!
//! This module provides the persistent key -> artifact mapping using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - One row per normalized origin URL ("key")
//! - Automatic schema migrations
//! - WAL mode for concurrent access, NORMAL synchronous
//! - Expiration sweeps driven by SQLite relative-time arithmetic
//!
//! Writes are serialized by the tokio-rusqlite background thread, which keeps
//! the embedded engine away from `SQLITE_BUSY`.

pub mod connection;
pub mod images;
pub mod key;
pub mod migrations;

pub use crate::Error;

pub use connection::ImageDb;
pub use images::ImageRow;
pub use key::{REGEN_PARAM, encode_query, origin_cache_key, request_cache_key};
