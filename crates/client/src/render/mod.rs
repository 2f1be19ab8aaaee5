//! Renderer: drive a tab to a screenshot on disk.
//!
//! A render borrows a tab from the pool, emulates the requested viewport and
//! color scheme, navigates to the target, optionally waits, and captures the
//! page to a randomly named file under the image directory. The destination
//! never survives a failed render.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::emulation::{MediaFeature, SetDeviceMetricsOverrideParams};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::page::ScreenshotParams;

use ogserver_core::{Error, ImageFormat, ImageOptions};

use crate::browser::BrowserPool;

/// Per-request screenshot options, parsed and clamped from the query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ShotOptions {
    /// Emulated viewport width in CSS pixels, [400, 2400].
    pub viewport_width: i64,
    /// Emulated viewport height; width / 1.9.
    pub viewport_height: i64,
    /// Device scale factor that maps the viewport to the output width.
    pub scale: f64,
    /// Post-navigation delay, [0, 10000] ms.
    pub delay_ms: u64,
    /// Emulate `prefers-color-scheme: dark`.
    pub dark: bool,
    /// Output format; per-request override or the process default.
    pub format: ImageFormat,
    /// JPEG quality from the process-wide options.
    pub quality: i64,
}

impl ShotOptions {
    /// Parse screenshot options from query pairs against the process-wide
    /// image options. Unparsable numbers fall back to defaults; out-of-range
    /// values are clamped.
    pub fn from_query(pairs: &[(String, String)], image: &ImageOptions) -> Self {
        let mut viewport_width: i64 = param(pairs, "width")
            .and_then(|w| w.parse().ok())
            .unwrap_or(0);
        if viewport_width == 0 {
            viewport_width = 1400;
        } else if viewport_width > 2400 {
            viewport_width = 2400;
        } else if viewport_width < 400 {
            viewport_width = 400;
        }
        let viewport_height = (viewport_width as f64 / 1.9) as i64;
        let scale = image.width / viewport_width as f64;

        let delay_ms = param(pairs, "delay")
            .and_then(|d| d.parse::<i64>().ok())
            .unwrap_or(0)
            .clamp(0, 10_000) as u64;

        let dark = param(pairs, "dark") == Some("true");

        let format = match param(pairs, "format") {
            Some("png") => ImageFormat::Png,
            Some("jpeg") => ImageFormat::Jpeg,
            _ => image.format,
        };

        Self { viewport_width, viewport_height, scale, delay_ms, dark, format, quality: image.quality }
    }
}

fn param<'a>(pairs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    pairs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
}

/// Render `target_url` to an image file under `image_dir`.
///
/// Returns the path of the written artifact. On any browser or I/O failure
/// the destination file is deleted and the error surfaces.
pub async fn render(
    pool: &BrowserPool,
    image_dir: &Path,
    target_url: &str,
    shot: &ShotOptions,
) -> Result<PathBuf, Error> {
    let tab = pool.acquire().await?;

    let file = tempfile::Builder::new()
        .prefix("")
        .rand_bytes(10)
        .suffix(shot.format.extension())
        .tempfile_in(image_dir)
        .map_err(Error::Io)?;
    let (file, path) = file.keep().map_err(|e| Error::Io(e.error))?;
    drop(file);

    tracing::debug!(url = target_url, file = %path.display(), "taking screenshot");

    let bytes = match drive(tab.page(), target_url, shot).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tokio::fs::remove_file(&path).await.ok();
            return Err(e);
        }
    };

    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        tokio::fs::remove_file(&path).await.ok();
        return Err(Error::Io(e));
    }

    Ok(path)
}

async fn drive(page: &Page, target_url: &str, shot: &ShotOptions) -> Result<Vec<u8>, Error> {
    if shot.dark {
        let features = vec![MediaFeature { name: "prefers-color-scheme".into(), value: "dark".into() }];
        page.emulate_media_features(features)
            .await
            .map_err(|e| Error::Navigation(format!("emulated media: {e}")))?;
    }

    let metrics = SetDeviceMetricsOverrideParams::builder()
        .width(shot.viewport_width)
        .height(shot.viewport_height)
        .device_scale_factor(shot.scale)
        .mobile(false)
        .build()
        .map_err(Error::Navigation)?;
    page.execute(metrics)
        .await
        .map_err(|e| Error::Navigation(format!("viewport emulation: {e}")))?;

    page.goto(target_url)
        .await
        .map_err(|e| Error::Navigation(e.to_string()))?;
    page.wait_for_navigation()
        .await
        .map_err(|e| Error::Navigation(e.to_string()))?;

    if shot.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(shot.delay_ms)).await;
    }

    let params = match shot.format {
        ImageFormat::Jpeg => ScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Jpeg)
            .quality(shot.quality)
            .build(),
        ImageFormat::Png => ScreenshotParams::builder().format(CaptureScreenshotFormat::Png).build(),
    };

    page.screenshot(params)
        .await
        .map_err(|e| Error::Capture(e.to_string()))
}
