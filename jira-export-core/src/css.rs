//! Rewrite `url(...)` references inside CSS text to embedded data URLs.

use regex::Regex;
use std::sync::OnceLock;

use crate::cache::ResourceCache;
use crate::contract::ResourceFetcher;
use crate::embed::{embed_resource, Embedded};

/// Result of rewriting one chunk of CSS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewrittenCss {
    pub css: String,
    /// References left pointing at their original location.
    pub unembedded: Vec<String>,
}

fn css_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"url\(\s*['"]?([^'")]+)['"]?\s*\)"#).expect("static CSS url() pattern is valid")
    })
}

/// Embed every `url(...)` in `css`, resolving relative references against
/// `base_url` (the location the CSS was served from).
///
/// Quotes around the reference are dropped; everything outside the `url(...)`
/// tokens is copied through unchanged.
pub async fn embed_css_resources<F>(
    css: &str,
    fetcher: &F,
    base_url: &str,
    cache: &mut ResourceCache,
) -> RewrittenCss
where
    F: ResourceFetcher + ?Sized,
{
    let mut out = String::with_capacity(css.len());
    let mut unembedded = Vec::new();
    let mut last = 0;

    for caps in css_url_regex().captures_iter(css) {
        let (Some(whole), Some(reference)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&css[last..whole.start()]);

        let embedded = embed_resource(fetcher, reference.as_str().trim(), base_url, cache).await;
        if let Embedded::Unembedded { original, .. } = &embedded {
            unembedded.push(original.clone());
        }
        out.push_str("url(");
        out.push_str(embedded.as_reference());
        out.push(')');

        last = whole.end();
    }
    out.push_str(&css[last..]);

    RewrittenCss { css: out, unembedded }
}
