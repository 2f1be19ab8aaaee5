//! Application configuration loaded from the environment.
//!
//! This module provides configuration management using figment for layered
//! configuration loading:
//!
//! 1. Environment variables (raw names, e.g. `DATA_DIR`, `PORT`)
//! 2. Built-in defaults
//!
//! Variable names are unprefixed because they are part of the deployment
//! contract; containers set `DATA_DIR`, `ALLOWED_DOMAINS` and friends
//! directly.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Environment variables read by [`AppConfig::load`].
const ENV_KEYS: &[&str] = &[
    "data_dir",
    "port",
    "allowed_domains",
    "regen_key",
    "cache_time",
    "max_tabs",
    "persist_browser",
    "remote_url",
    "font_family",
    "img_format",
    "img_width",
    "img_quality",
    "log_level",
];

/// Output format for rendered artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension including the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => ".jpg",
            ImageFormat::Png => ".png",
        }
    }

    /// MIME type for HTTP responses.
    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// Process-wide image encoding options, resolved once at startup.
#[derive(Debug, Clone, Copy)]
pub struct ImageOptions {
    pub format: ImageFormat,
    /// Encoding quality in [1, 100]; only meaningful for JPEG.
    pub quality: i64,
    /// Output width in pixels; the renderer scales the viewport to hit this.
    pub width: f64,
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Root data directory; `db/`, `images/` and `templates/` live under it.
    ///
    /// Set via DATA_DIR.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// TCP port the server listens on.
    ///
    /// Set via PORT.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Comma-separated host[:port] allowlist; empty permits all hosts.
    ///
    /// Set via ALLOWED_DOMAINS.
    #[serde(default)]
    pub allowed_domains: String,

    /// Secret for the `_regen_` query parameter; empty disables regeneration.
    ///
    /// Set via REGEN_KEY.
    #[serde(default)]
    pub regen_key: String,

    /// Artifact retention window, as a SQLite relative-time string
    /// (e.g. "30 days", "1 hour").
    ///
    /// Set via CACHE_TIME.
    #[serde(default = "default_cache_time")]
    pub cache_time: String,

    /// Maximum concurrent browser tabs.
    ///
    /// Set via MAX_TABS.
    #[serde(default = "default_max_tabs")]
    pub max_tabs: usize,

    /// How long the browser process is kept alive with no open tabs,
    /// as a human duration (e.g. "5m", "90s").
    ///
    /// Set via PERSIST_BROWSER.
    #[serde(default = "default_persist_browser")]
    pub persist_browser: String,

    /// DevTools websocket endpoint of a remote browser. When set, no local
    /// browser process is managed.
    ///
    /// Set via REMOTE_URL.
    #[serde(default)]
    pub remote_url: Option<String>,

    /// System font family passed to the local browser.
    ///
    /// Set via FONT_FAMILY.
    #[serde(default)]
    pub font_family: Option<String>,

    /// Default artifact format, "jpeg" or "png".
    ///
    /// Set via IMG_FORMAT.
    #[serde(default = "default_img_format")]
    pub img_format: ImageFormat,

    /// Output image width in pixels, [1000, 2500].
    ///
    /// Set via IMG_WIDTH.
    #[serde(default = "default_img_width")]
    pub img_width: f64,

    /// JPEG encoding quality, [1, 100].
    ///
    /// Set via IMG_QUALITY.
    #[serde(default = "default_img_quality")]
    pub img_quality: i64,

    /// Tracing filter directive, e.g. "info" or "debug".
    ///
    /// Set via LOG_LEVEL.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_port() -> u16 {
    8080
}

fn default_cache_time() -> String {
    "30 days".into()
}

fn default_max_tabs() -> usize {
    5
}

fn default_persist_browser() -> String {
    "5m".into()
}

fn default_img_format() -> ImageFormat {
    ImageFormat::Jpeg
}

fn default_img_width() -> f64 {
    2000.0
}

fn default_img_quality() -> i64 {
    92
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            port: default_port(),
            allowed_domains: String::new(),
            regen_key: String::new(),
            cache_time: default_cache_time(),
            max_tabs: default_max_tabs(),
            persist_browser: default_persist_browser(),
            remote_url: None,
            font_family: None,
            img_format: default_img_format(),
            img_width: default_img_width(),
            img_quality: default_img_quality(),
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment over built-in defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if environment variables cannot be parsed into
    /// their target types or validation fails after loading.
    pub fn load() -> Result<Self, ConfigError> {
        let figment = Figment::from(Serialized::defaults(Self::default())).merge(
            Env::raw()
                .map(|key| key.as_str().to_lowercase().into())
                .only(ENV_KEYS),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Directory holding the SQLite database.
    pub fn db_dir(&self) -> PathBuf {
        self.data_dir.join("db")
    }

    /// Path of the SQLite database file.
    pub fn db_path(&self) -> PathBuf {
        self.db_dir().join("social-image-server.db")
    }

    /// Directory holding rendered artifacts.
    pub fn image_dir(&self) -> PathBuf {
        self.data_dir.join("images")
    }

    /// Directory holding user-provided templates.
    pub fn template_dir(&self) -> PathBuf {
        self.data_dir.join("templates")
    }

    /// The allowed-domain set; empty means all hosts are permitted.
    pub fn allowed_domain_set(&self) -> HashSet<String> {
        self.allowed_domains
            .split(',')
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Browser idle persistence as a Duration.
    ///
    /// `validate` guarantees the string parses, so errors here fall back to
    /// the default rather than panicking.
    pub fn persist_duration(&self) -> Duration {
        humantime::parse_duration(&self.persist_browser).unwrap_or(Duration::from_secs(300))
    }

    /// Process-wide image options.
    pub fn image_options(&self) -> ImageOptions {
        ImageOptions { format: self.img_format, quality: self.img_quality, width: self.img_width }
    }
}
