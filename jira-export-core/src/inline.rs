//! # inline: make an issue page self-contained
//!
//! [`embed_external_resources`] parses a fetched page once, rewrites every
//! external reference it can reach into a `data:` URL and serializes the tree
//! back to text. The passes run in a fixed order:
//!
//! 1. `<link rel="stylesheet">` → inline `<style>` (sub-resources embedded,
//!    relative to the stylesheet's own URL)
//! 2. `url()` references inside the page's own `<style>` blocks
//! 3. `<img src>`
//! 4. `style="..."` attributes
//! 5. the print stylesheet is appended to `<head>`
//! 6. instruction boxes and the previous-view control are removed (optional)
//!
//! Resource failures never abort the pass; they are collected in
//! the `unembedded` list of [`InlineOutcome::Rewritten`]. A failure of the pass itself yields
//! [`InlineOutcome::Unmodified`] with the input HTML untouched.

use html5ever::{LocalName, Namespace, QualName};
use kuchiki::traits::TendrilSink;
use kuchiki::{Attribute, ExpandedName, NodeRef};
use std::fmt;
use tracing::{debug, error, info, warn};

use crate::cache::{CachePartition, ResourceCache};
use crate::contract::ResourceFetcher;
use crate::css::embed_css_resources;
use crate::embed::{embed_resource, resolve_url};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Appended to every exported page as `<style media="print">`.
pub const PRINT_STYLESHEET: &str = r#"
            @page {
                size: A4;
                margin: 1cm;
            }
            body {
                font-family: Arial, sans-serif;
                font-size: 11pt;
                line-height: 1.3;
            }
            a {
                text-decoration: underline;
                color: #000;
            }
            .no-print, #previous-view, header, nav {
                display: none !important;
            }
            table {
                page-break-inside: auto;
                border-collapse: collapse;
            }
            tr {
                page-break-inside: avoid;
                page-break-after: auto;
            }
            th, td {
                border: 1px solid #ddd;
                padding: 4px;
            }
            img {
                max-width: 100% !important;
                height: auto !important;
            }
        "#;

#[derive(Debug)]
pub enum InlineError {
    Selector(&'static str),
    MissingHead,
    Serialize(std::io::Error),
    Encoding(std::string::FromUtf8Error),
}

impl fmt::Display for InlineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineError::Selector(sel) => write!(f, "invalid selector: {sel}"),
            InlineError::MissingHead => write!(f, "document has no <head> element"),
            InlineError::Serialize(e) => write!(f, "failed to serialize document: {e}"),
            InlineError::Encoding(e) => write!(f, "serialized document is not UTF-8: {e}"),
        }
    }
}

impl std::error::Error for InlineError {}

impl From<std::io::Error> for InlineError {
    fn from(e: std::io::Error) -> Self {
        InlineError::Serialize(e)
    }
}

impl From<std::string::FromUtf8Error> for InlineError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        InlineError::Encoding(e)
    }
}

#[derive(Debug)]
pub enum InlineOutcome {
    Rewritten {
        html: String,
        /// References (stylesheets, images, CSS sub-resources) that stayed external.
        unembedded: Vec<String>,
    },
    /// The pass failed; `html` is the input exactly as given.
    Unmodified { html: String, error: InlineError },
}

impl InlineOutcome {
    pub fn html(&self) -> &str {
        match self {
            InlineOutcome::Rewritten { html, .. } | InlineOutcome::Unmodified { html, .. } => html,
        }
    }

    pub fn into_html(self) -> String {
        match self {
            InlineOutcome::Rewritten { html, .. } | InlineOutcome::Unmodified { html, .. } => html,
        }
    }

    pub fn is_rewritten(&self) -> bool {
        matches!(self, InlineOutcome::Rewritten { .. })
    }
}

/// Embed all external resources of `html` (fetched from `base_url`).
///
/// With `remove_instructions` set, elements with class `no-print` and the
/// `#previous-view` element are removed from the output.
pub async fn embed_external_resources<F>(
    html: &str,
    base_url: &str,
    fetcher: &F,
    remove_instructions: bool,
    cache: &mut ResourceCache,
) -> InlineOutcome
where
    F: ResourceFetcher + ?Sized,
{
    match inline_document(html, base_url, fetcher, remove_instructions, cache).await {
        Ok((rewritten, unembedded)) => {
            if !unembedded.is_empty() {
                warn!(count = unembedded.len(), base_url = %base_url, "Some resources were left external");
            }
            InlineOutcome::Rewritten {
                html: rewritten,
                unembedded,
            }
        }
        Err(e) => {
            error!(error = %e, base_url = %base_url, "Error embedding resources, keeping original HTML");
            InlineOutcome::Unmodified {
                html: html.to_string(),
                error: e,
            }
        }
    }
}

async fn inline_document<F>(
    html: &str,
    base_url: &str,
    fetcher: &F,
    remove_instructions: bool,
    cache: &mut ResourceCache,
) -> Result<(String, Vec<String>), InlineError>
where
    F: ResourceFetcher + ?Sized,
{
    let document = kuchiki::parse_html().one(html);
    let mut unembedded = Vec::new();

    // Collected up front so stylesheets inlined below are not rewritten twice.
    let existing_styles = select_all(&document, "style")?;

    for link in select_all(&document, "link[rel~=\"stylesheet\"]")? {
        let Some(href) = attribute(&link, "href") else {
            continue;
        };
        match stylesheet_text(&href, base_url, fetcher, cache, &mut unembedded).await {
            Ok(css) => {
                let style = new_element("style");
                style.append(NodeRef::new_text(css));
                link.insert_before(style);
                link.detach();
                info!(href = %href, "Embedded CSS");
            }
            Err(reason) => {
                warn!(href = %href, error = %reason, "Failed to process CSS");
                unembedded.push(href);
            }
        }
    }

    for style in existing_styles {
        let css = style.text_contents();
        if css.is_empty() {
            continue;
        }
        let rewritten = embed_css_resources(&css, fetcher, base_url, cache).await;
        unembedded.extend(rewritten.unembedded);
        replace_text(&style, rewritten.css);
    }

    for img in select_all(&document, "img[src]")? {
        let Some(src) = attribute(&img, "src") else {
            continue;
        };
        debug!(src = %src, "Processing image");
        let embedded = embed_resource(fetcher, &src, base_url, cache).await;
        if embedded.is_unembedded() {
            unembedded.push(src);
        }
        set_attribute(&img, "src", embedded.into_reference());
    }

    for element in select_all(&document, "[style]")? {
        let Some(inline_css) = attribute(&element, "style") else {
            continue;
        };
        let rewritten = embed_css_resources(&inline_css, fetcher, base_url, cache).await;
        unembedded.extend(rewritten.unembedded);
        set_attribute(&element, "style", rewritten.css);
    }

    let head = document
        .select_first("head")
        .map_err(|()| InlineError::MissingHead)?;
    let print_style = new_element("style");
    set_attribute(&print_style, "media", "print".to_string());
    print_style.append(NodeRef::new_text(PRINT_STYLESHEET));
    head.as_node().append(print_style);

    if remove_instructions {
        for element in select_all(&document, ".no-print")? {
            element.detach();
            info!("Removed instruction box element");
        }
        if let Ok(previous_view) = document.select_first("#previous-view") {
            previous_view.as_node().detach();
            info!("Removed previous-view element");
        }
    }

    let mut out = Vec::with_capacity(html.len());
    document.serialize(&mut out)?;
    Ok((String::from_utf8(out)?, unembedded))
}

/// Rewritten text for the stylesheet at `href`, from the `css` partition when
/// possible. Errors leave the `<link>` in place.
async fn stylesheet_text<F>(
    href: &str,
    base_url: &str,
    fetcher: &F,
    cache: &mut ResourceCache,
    unembedded: &mut Vec<String>,
) -> Result<String, String>
where
    F: ResourceFetcher + ?Sized,
{
    let css_url = resolve_url(base_url, href).map_err(|e| format!("unresolvable URL: {e}"))?;
    if let Some(cached) = cache.get(CachePartition::Css, &css_url) {
        info!(url = %css_url, "Using cached CSS");
        return Ok(cached.to_string());
    }

    info!(url = %css_url, "Processing CSS");
    let response = fetcher.get(&css_url).await.map_err(|e| e.to_string())?;
    let rewritten = embed_css_resources(&response.text(), fetcher, &css_url, cache).await;
    unembedded.extend(rewritten.unembedded);
    cache.put(CachePartition::Css, css_url, rewritten.css.clone());
    Ok(rewritten.css)
}

fn select_all(document: &NodeRef, selector: &'static str) -> Result<Vec<NodeRef>, InlineError> {
    // Collected because several passes detach nodes while walking.
    Ok(document
        .select(selector)
        .map_err(|()| InlineError::Selector(selector))?
        .map(|element| element.as_node().clone())
        .collect())
}

fn attribute(node: &NodeRef, name: &str) -> Option<String> {
    let element = node.as_element()?;
    let attributes = element.attributes.borrow();
    attributes.get(name).map(str::to_string)
}

fn set_attribute(node: &NodeRef, name: &str, value: String) {
    if let Some(element) = node.as_element() {
        element.attributes.borrow_mut().insert(name, value);
    }
}

fn replace_text(node: &NodeRef, text: String) {
    let children: Vec<NodeRef> = node.children().collect();
    for child in children {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

fn new_element(tag: &str) -> NodeRef {
    NodeRef::new_element(
        QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from(tag)),
        Vec::<(ExpandedName, Attribute)>::new(),
    )
}

