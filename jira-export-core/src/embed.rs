//! Download a single resource and turn it into a `data:` URL.
//!
//! [`embed_resource`] never fails: anything that cannot be embedded comes back
//! as [`Embedded::Unembedded`] carrying the caller's original reference, so the
//! document keeps a usable (if external) link and the failure stays visible.

use base64::Engine;
use tracing::{debug, warn};
use url::Url;

use crate::cache::{CachePartition, ResourceCache};
use crate::contract::ResourceFetcher;

const OCTET_STREAM: &str = "application/octet-stream";
const PASSTHROUGH_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/gif", "image/svg+xml"];

/// Outcome of embedding one reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Embedded {
    /// The resource was downloaded (now or earlier in the run) and encoded.
    Inlined(String),
    /// `data:` and `javascript:` references are left as they are.
    Passthrough(String),
    /// The resource could not be embedded; `original` is the reference exactly
    /// as it appeared in the document.
    Unembedded { original: String, reason: String },
}

impl Embedded {
    /// The string to write back into the document.
    pub fn as_reference(&self) -> &str {
        match self {
            Embedded::Inlined(s) | Embedded::Passthrough(s) => s,
            Embedded::Unembedded { original, .. } => original,
        }
    }

    pub fn into_reference(self) -> String {
        match self {
            Embedded::Inlined(s) | Embedded::Passthrough(s) => s,
            Embedded::Unembedded { original, .. } => original,
        }
    }

    pub fn is_unembedded(&self) -> bool {
        matches!(self, Embedded::Unembedded { .. })
    }
}

fn has_scheme(url: &str, scheme: &str) -> bool {
    url.get(..scheme.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
}

/// `data:` and `javascript:` references are never fetched.
pub fn is_passthrough(url: &str) -> bool {
    has_scheme(url, "data:") || has_scheme(url, "javascript:")
}

/// Resolve `url` against `base_url` unless it is already an absolute http(s) URL.
pub fn resolve_url(base_url: &str, url: &str) -> Result<String, url::ParseError> {
    if has_scheme(url, "http://") || has_scheme(url, "https://") {
        return Ok(url.to_string());
    }
    let base = Url::parse(base_url)?;
    Ok(base.join(url)?.to_string())
}

/// Collapse a `Content-Type` header to the MIME type used in the data URL.
pub fn normalize_mime(content_type: Option<&str>) -> &'static str {
    let essence = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();
    if essence == "text/css" {
        return "text/css";
    }
    PASSTHROUGH_IMAGE_TYPES
        .into_iter()
        .find(|t| *t == essence)
        .unwrap_or(OCTET_STREAM)
}

pub fn to_data_url(mime: &str, body: &[u8]) -> String {
    let encoded_capacity = base64::encoded_len(body.len(), true).unwrap_or(0);
    let mut data_url = String::with_capacity(encoded_capacity + mime.len() + 13);
    data_url.push_str("data:");
    data_url.push_str(mime);
    data_url.push_str(";base64,");
    base64::engine::general_purpose::STANDARD.encode_string(body, &mut data_url);
    data_url
}

/// Embed the resource at `url` (relative to `base_url`), consulting and filling
/// the `resources` partition of `cache`.
pub async fn embed_resource<F>(
    fetcher: &F,
    url: &str,
    base_url: &str,
    cache: &mut ResourceCache,
) -> Embedded
where
    F: ResourceFetcher + ?Sized,
{
    if is_passthrough(url) {
        return Embedded::Passthrough(url.to_string());
    }

    let absolute = match resolve_url(base_url, url) {
        Ok(absolute) => absolute,
        Err(e) => {
            warn!(url = %url, base_url = %base_url, error = %e, "Failed to resolve resource URL");
            return Embedded::Unembedded {
                original: url.to_string(),
                reason: format!("unresolvable URL: {e}"),
            };
        }
    };

    if let Some(cached) = cache.get(CachePartition::Resources, &absolute) {
        debug!(url = %absolute, "Using cached resource");
        return Embedded::Inlined(cached.to_string());
    }

    debug!(url = %absolute, "Downloading resource");
    match fetcher.get(&absolute).await {
        Ok(resource) => {
            let mime = normalize_mime(resource.content_type.as_deref());
            let data_url = to_data_url(mime, &resource.body);
            cache.put(CachePartition::Resources, absolute.clone(), data_url.clone());
            debug!(url = %absolute, mime = mime, size = resource.body.len(), "Resource embedded");
            Embedded::Inlined(data_url)
        }
        Err(e) => {
            warn!(url = %absolute, error = %e, "Failed to download resource");
            Embedded::Unembedded {
                original: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}
