//! HTML page model
//!
//! A [`Page`] is what the crawler stores on a frontier entry after a `200`
//! response. It keeps the source HTML and the extracted anchors; DOM queries
//! parse the HTML on demand, which keeps `Page` (and therefore a whole
//! frontier) `Send`.

mod links;

pub use links::Link;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

/// Page query errors
#[derive(Debug, Error)]
pub enum PageError {
    #[error("Invalid CSS selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

/// Result type for page queries
pub type PageResult<T> = Result<T, PageError>;

/// Tags whose content never counts as visible text
const NON_TEXT_TAGS: &[&str] = &[
    "head", "script", "noscript", "style", "iframe", "noembed", "noframes",
];

/// Inline, list and table-part tags skipped when looking for a block
const NON_BLOCK_TAGS: &[&str] = &[
    "a", "abbr", "acronym", "b", "bdo", "big", "br", "button", "cite", "code", "del", "dfn", "em",
    "i", "img", "ins", "input", "kbd", "label", "map", "mark", "object", "output", "q", "samp",
    "script", "select", "small", "span", "strong", "sub", "sup", "textarea", "time", "tt", "var",
    "li", "dl", "dt", "dd", "tr", "th", "td",
];

const NEXT_KEYWORDS: &[&str] = &["volgende", "next", "meer", "more", "ouder", "older"];
const PREV_KEYWORDS: &[&str] = &["vorige", "previous", "prev", "nieuwe", "newer"];

/// Where [`Page::find_links`] should look
#[derive(Debug, Clone, Copy)]
pub struct LinkSearch {
    pub in_path: bool,
    pub in_text: bool,
    pub internal: bool,
    pub external: bool,
}

impl Default for LinkSearch {
    fn default() -> Self {
        Self {
            in_path: true,
            in_text: true,
            internal: true,
            external: true,
        }
    }
}

/// A parsed HTML page
#[derive(Debug, Clone)]
pub struct Page {
    url: Url,
    html: String,
    links: Vec<Link>,
}

impl Page {
    /// Parses HTML fetched from `url` and extracts its anchors
    ///
    /// # Example
    ///
    /// ```
    /// use sitemapper::page::Page;
    /// use url::Url;
    ///
    /// let html = r#"<html><head><title>Home</title></head><body><a href="/a">A</a></body></html>"#;
    /// let page = Page::parse(html, Url::parse("https://example.test/").unwrap());
    /// assert_eq!(page.title(), Some("Home".to_string()));
    /// assert_eq!(page.internal_links().count(), 1);
    /// ```
    pub fn parse(html: &str, url: Url) -> Self {
        let document = Html::parse_document(html);
        let links = links::extract_links(&document, &url);

        Self {
            url,
            html: html.to_string(),
            links,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn html(&self) -> &str {
        &self.html
    }

    /// Parses the stored HTML into a fresh DOM for arbitrary queries
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }

    /// All followable links, in document order
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn internal_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| link.is_internal)
    }

    pub fn external_links(&self) -> impl Iterator<Item = &Link> {
        self.links.iter().filter(|link| !link.is_internal)
    }

    /// Returns the outer HTML of every element matching `selector`
    pub fn select(&self, selector: &str) -> PageResult<Vec<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();
        Ok(document.select(&selector).map(|el| el.html()).collect())
    }

    /// Returns the trimmed text of every element matching `selector`
    pub fn select_text(&self, selector: &str) -> PageResult<Vec<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();
        Ok(document
            .select(&selector)
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect())
    }

    /// Returns the trimmed text of the first element matching `selector`
    pub fn select_first_text(&self, selector: &str) -> PageResult<Option<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();
        Ok(document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }

    /// Returns the page title (from the `<title>` tag)
    pub fn title(&self) -> Option<String> {
        self.select_first_text("title")
            .ok()
            .flatten()
            .filter(|s| !s.is_empty())
    }

    /// Visible text of the page
    ///
    /// Content of `head`, `script`, `style` and similar tags is skipped.
    /// Text nodes are trimmed and joined with single spaces.
    pub fn text(&self) -> String {
        let document = self.document();
        let mut parts = Vec::new();

        for node in document.root_element().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };

            let hidden = node.ancestors().any(|ancestor| {
                ancestor
                    .value()
                    .as_element()
                    .map(|el| NON_TEXT_TAGS.contains(&el.name()))
                    .unwrap_or(false)
            });

            let trimmed = text.trim();
            if !hidden && !trimmed.is_empty() {
                parts.push(trimmed.to_string());
            }
        }

        parts.join(" ")
    }

    /// Returns the text of matching elements whose own text contains any needle
    pub fn find_in_text(&self, selector: &str, needles: &[&str]) -> PageResult<Vec<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();

        Ok(document
            .select(&selector)
            .filter(|el| {
                let own = own_text(el);
                needles.iter().any(|needle| own.contains(needle))
            })
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect())
    }

    /// Like [`Page::find_in_text`], with a regular expression instead of needles
    ///
    /// ```
    /// use regex::Regex;
    /// use sitemapper::page::Page;
    /// use url::Url;
    ///
    /// let page = Page::parse("<p>Een test tag</p>", Url::parse("https://example.test/").unwrap());
    /// let found = page.find_in_text_regex("p", &Regex::new(r"t\wst").unwrap()).unwrap();
    /// assert_eq!(found, vec!["Een test tag"]);
    /// ```
    pub fn find_in_text_regex(&self, selector: &str, pattern: &Regex) -> PageResult<Vec<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();

        Ok(document
            .select(&selector)
            .filter(|el| pattern.is_match(&own_text(el)))
            .map(|el| el.text().collect::<String>().trim().to_string())
            .collect())
    }

    /// Outer HTML of the `depth`-th ancestor of the first element matching
    /// `selector`
    ///
    /// Climbing stops at the document element, so a `depth` larger than the
    /// nesting returns `<html>`. A `depth` of 0 returns the element itself.
    pub fn parent_html(&self, selector: &str, depth: usize) -> PageResult<Option<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();

        Ok(document.select(&selector).next().map(|el| {
            let mut current = el;
            for _ in 0..depth {
                match current.parent().and_then(ElementRef::wrap) {
                    Some(parent) => current = parent,
                    None => break,
                }
            }
            current.html()
        }))
    }

    /// Outer HTML of the nearest block-level element enclosing the first
    /// match of `selector`, the match included
    ///
    /// Inline, list item and table cell/row tags are not blocks, so for an
    /// `<li>` this is the surrounding list.
    pub fn first_block_html(&self, selector: &str) -> PageResult<Option<String>> {
        let selector = parse_selector(selector)?;
        let document = self.document();

        Ok(document.select(&selector).next().and_then(|el| {
            std::iter::successors(Some(el), |el| el.parent().and_then(ElementRef::wrap))
                .find(|el| !NON_BLOCK_TAGS.contains(&el.value().name()))
                .map(|el| el.html())
        }))
    }

    /// Finds links whose path segments or anchor text contain any needle
    ///
    /// Matching is case-insensitive. A needle matches a path segment only
    /// when it equals the whole segment; it matches anchor text when it is a
    /// substring.
    pub fn find_links(&self, needles: &[&str], search: LinkSearch) -> Vec<&Link> {
        let needles: Vec<String> = needles.iter().map(|n| n.to_lowercase()).collect();

        self.links
            .iter()
            .filter(|link| {
                (link.is_internal && search.internal) || (!link.is_internal && search.external)
            })
            .filter(|link| {
                let segments = if search.in_path {
                    link.path_segments()
                } else {
                    Vec::new()
                };
                let text = link.text.to_lowercase();

                needles.iter().any(|needle| {
                    segments.iter().any(|segment| segment == needle)
                        || (search.in_text && text.contains(needle.as_str()))
                })
            })
            .collect()
    }

    /// URL of the next page in a paginated listing
    ///
    /// Prefers `<link rel="next">`; otherwise picks an internal anchor that
    /// mentions a "next" keyword and carries a navigation class or id.
    pub fn next_page_url(&self) -> Option<String> {
        self.pagination_url("next", NEXT_KEYWORDS, &["nav", "next"])
    }

    /// URL of the previous page in a paginated listing
    pub fn previous_page_url(&self) -> Option<String> {
        self.pagination_url("prev", PREV_KEYWORDS, &["nav", "prev"])
    }

    fn pagination_url(&self, rel: &str, keywords: &[&str], markers: &[&str]) -> Option<String> {
        let rel_selector = format!("link[rel='{}'][href]", rel);
        if let Ok(selector) = Selector::parse(&rel_selector) {
            let document = self.document();
            if let Some(href) = document
                .select(&selector)
                .next()
                .and_then(|el| el.value().attr("href"))
            {
                return crate::url::make_absolute(href, &self.url)
                    .ok()
                    .map(|url| url.to_string());
            }
        }

        let search = LinkSearch {
            external: false,
            ..LinkSearch::default()
        };

        self.find_links(keywords, search)
            .into_iter()
            .find(|link| {
                let class_id = format!("{} {}", link.attr("class"), link.attr("id")).to_lowercase();
                markers.iter().any(|marker| class_id.contains(marker))
            })
            .map(|link| link.absolute_url.clone())
    }
}

/// Text of the element's direct text children only
fn own_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|child| child.value().as_text().map(|t| (&**t).to_string()))
        .collect()
}

fn parse_selector(selector: &str) -> PageResult<Selector> {
    Selector::parse(selector).map_err(|e| PageError::Selector {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}
