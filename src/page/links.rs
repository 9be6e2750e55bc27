//! Anchor extraction
//!
//! Turns `<a href>` elements into absolute [`Link`]s classified as internal or
//! external relative to the page they were found on.

use crate::url::{make_absolute, same_site};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use url::Url;

/// An anchor found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// The raw `href` attribute
    pub href: String,

    /// The href resolved against the page URL
    pub absolute_url: String,

    /// Visible anchor text, whitespace collapsed
    pub text: String,

    /// True if the link points at the page's own site
    pub is_internal: bool,

    /// All attributes of the anchor element
    pub attributes: HashMap<String, String>,
}

impl Link {
    /// Lowercased, non-empty path segments of the absolute URL
    pub fn path_segments(&self) -> Vec<String> {
        Url::parse(&self.absolute_url)
            .map(|url| {
                url.path()
                    .split('/')
                    .filter(|segment| !segment.is_empty())
                    .map(|segment| segment.to_lowercase())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns an attribute value or an empty string
    pub fn attr(&self, name: &str) -> &str {
        self.attributes.get(name).map(String::as_str).unwrap_or("")
    }
}

/// Extracts all followable anchors from a document
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - Empty hrefs
/// - Fragment-only hrefs (`#section`)
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - Hrefs that cannot be resolved against the page URL
/// - Non-HTTP(S) URLs after resolution
pub(crate) fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let mut links = Vec::new();

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return links;
    };

    for element in document.select(&a_selector) {
        if let Some(link) = build_link(element, base_url) {
            links.push(link);
        }
    }

    links
}

fn build_link(element: ElementRef<'_>, base_url: &Url) -> Option<Link> {
    let href = element.value().attr("href")?.trim();

    if href.is_empty() || is_skipped_href(href) {
        return None;
    }

    let absolute = make_absolute(href, base_url).ok()?;
    if absolute.scheme() != "http" && absolute.scheme() != "https" {
        return None;
    }

    let text = element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");

    let attributes = element
        .value()
        .attrs()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    Some(Link {
        href: href.to_string(),
        is_internal: same_site(&absolute, base_url),
        absolute_url: absolute.to_string(),
        text,
        attributes,
    })
}

fn is_skipped_href(href: &str) -> bool {
    href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
}
