//! Cache-key derivation for requests and origin declarations.
//!
//! A cache key fingerprints the "rendering intent" of a request: the encoded
//! query string with the regeneration secret removed, prefixed by the
//! template name for template requests. The same derivation is applied to the
//! origin's declared `og:image` URL so the three-way comparison
//! (request / stored / origin) operates on a single representation.

use std::collections::BTreeMap;

use url::Url;
use url::form_urlencoded;

/// Query parameter carrying the regeneration secret. Always stripped before
/// fingerprinting, whatever its value.
pub const REGEN_PARAM: &str = "_regen_";

/// Encode query pairs deterministically: keys sorted, values in their
/// original order per key, form-urlencoded.
///
/// Also used to rebuild the query string handed to a locally served
/// template.
pub fn encode_query<'a, I>(pairs: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut grouped: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (k, v) in pairs {
        grouped.entry(k).or_default().push(v);
    }

    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (k, values) in grouped {
        for v in values {
            serializer.append_pair(k, v);
        }
    }
    serializer.finish()
}

/// Compute the cache key of a request from its query pairs.
///
/// `template` is the template name for template requests, None for captures.
pub fn request_cache_key(template: Option<&str>, pairs: &[(String, String)]) -> String {
    let filtered = pairs
        .iter()
        .filter(|(k, _)| k != REGEN_PARAM)
        .map(|(k, v)| (k.as_str(), v.as_str()));
    format!("{}{}", template.unwrap_or_default(), encode_query(filtered))
}

/// Compute the cache key declared by an origin's `og:image` URL.
///
/// The URL's query is fingerprinted the same way as a request; when its path
/// addresses a template (`/template/<name>/...`), the name becomes the
/// prefix. An empty or unparsable URL yields an empty key.
pub fn origin_cache_key(og_image_url: &str) -> String {
    if og_image_url.is_empty() {
        return String::new();
    }
    let Ok(url) = Url::parse(og_image_url) else {
        return String::new();
    };

    let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
    request_cache_key(template_name(url.path()).as_deref(), &pairs)
}

/// Template name addressed by a request path, if any.
fn template_name(path: &str) -> Option<String> {
    let mut segments = path.trim_start_matches('/').split('/');
    if segments.next() != Some("template") {
        return None;
    }
    segments
        .next()
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}
