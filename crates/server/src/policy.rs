//! Cache policy engine: the request -> serve / regenerate / reject decision.
//!
//! The decision reconciles three fingerprints of rendering intent: the one
//! carried by the request, the one stored with the artifact, and the one the
//! origin currently declares through its `og:image` tag. The rules, first
//! match wins:
//!
//! 1. A valid `_regen_` secret always regenerates (MISS/1), no probe.
//! 2. The stored fingerprint matches the request: serve the artifact (HIT/2).
//! 3. The origin is unreachable: 502, nothing changes.
//! 4. An artifact exists but the request disagrees with the origin: serve the
//!    existing artifact (HIT/3). A stale or spoofed request fingerprint must
//!    not trigger a render from client-controlled intent.
//! 5. Otherwise regenerate (MISS/0): either there is no artifact, or the
//!    origin itself moved on.
//!
//! The functions here are pure; the handler owns the per-key mutex, the probe
//! call, and the render.

use ogserver_client::ProbeOutcome;
use ogserver_core::ImageRow;
use ogserver_core::cache::origin_cache_key;

/// Outcome class of a request, surfaced as `X-Og-Cache` / `X-Og-Code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheCode {
    /// MISS/0: rendered because no artifact matched and the origin agreed.
    Regenerated,
    /// MISS/1: rendered because the regeneration secret was presented.
    Forced,
    /// HIT/2: the stored fingerprint matched the request.
    Fresh,
    /// HIT/3: request disagreed with both stored and origin fingerprints.
    Mismatch,
}

impl CacheCode {
    pub fn cache(self) -> &'static str {
        match self {
            CacheCode::Regenerated | CacheCode::Forced => "MISS",
            CacheCode::Fresh | CacheCode::Mismatch => "HIT",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            CacheCode::Regenerated => "0",
            CacheCode::Forced => "1",
            CacheCode::Fresh => "2",
            CacheCode::Mismatch => "3",
        }
    }
}

/// What the handler should do for a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Render, store the artifact under the request fingerprint, serve it.
    Render(CacheCode),
    /// Serve the stored artifact file.
    ServeStored { file: String, code: CacheCode },
    /// 502; the origin did not answer.
    OriginUnreachable,
}

/// Rules 1 and 2, which need no origin probe.
///
/// Returns None when the origin has to be consulted.
pub fn before_probe(regen_valid: bool, stored: Option<&ImageRow>, request_key: &str) -> Option<Decision> {
    if regen_valid {
        return Some(Decision::Render(CacheCode::Forced));
    }

    if let Some(row) = stored
        && row.cache_key == request_key
    {
        return Some(Decision::ServeStored { file: row.file.clone(), code: CacheCode::Fresh });
    }

    None
}

/// Rules 3 through 5, applied to the probe outcome.
pub fn after_probe(stored: Option<&ImageRow>, request_key: &str, probe: &ProbeOutcome) -> Decision {
    let og_image = match probe {
        ProbeOutcome::Unreachable => return Decision::OriginUnreachable,
        ProbeOutcome::Reachable { og_image } => og_image,
    };

    let origin_key = origin_cache_key(og_image);

    if let Some(row) = stored
        && request_key != origin_key
    {
        return Decision::ServeStored { file: row.file.clone(), code: CacheCode::Mismatch };
    }

    Decision::Render(CacheCode::Regenerated)
}
