//! Outbound side of ogserver.
//!
//! This crate provides the origin probe (HTTP fetch + og:image extraction),
//! the browser pool, and the renderer that drives a tab to a screenshot.

pub mod browser;
pub mod probe;
pub mod render;

pub use browser::{BrowserPool, PoolConfig, Tab};
pub use probe::{Probe, ProbeOutcome};
pub use render::{ShotOptions, render};
