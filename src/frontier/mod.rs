//! Frontier of one site crawl
//!
//! The frontier is an insertion-ordered map from canonical URL to
//! [`FrontierEntry`]. Entries are never removed and the first insertion of a
//! key wins; later inserts of the same key are no-ops.
//!
//! # Components
//!
//! - `FrontierEntry`: depth, status, parsed page, redirect target and data of one URL
//! - `Frontier`: the ordered map plus the visited counter

mod entry;

pub use entry::FrontierEntry;

use crate::page::Page;
use crate::url::{canonicalize, extract_domain, CanonicalUrl};
use crate::UrlError;
use indexmap::IndexMap;
use url::Url;

/// The known URLs of one site and their crawl state
#[derive(Debug, Clone)]
pub struct Frontier {
    scheme: String,
    domain: String,
    entries: IndexMap<CanonicalUrl, FrontierEntry>,
    visited: usize,
}

impl Frontier {
    /// Creates a frontier holding the site root at depth 0
    ///
    /// The root is `scheme://host` of `url`; any path is dropped.
    ///
    /// # Example
    ///
    /// ```
    /// use sitemapper::Frontier;
    ///
    /// let frontier = Frontier::new("https://example.test/some/page").unwrap();
    /// assert_eq!(frontier.home_page(), "https://example.test");
    /// assert_eq!(frontier.len(), 1);
    /// ```
    pub fn new(url: &str) -> Result<Self, UrlError> {
        let parsed =
            Url::parse(url.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", url, e)))?;
        let domain =
            extract_domain(&parsed).ok_or_else(|| UrlError::MissingDomain(url.to_string()))?;
        let scheme = parsed.scheme().to_string();

        let root = FrontierEntry::new(&format!("{}://{}", scheme, domain), 0)?;

        let mut entries = IndexMap::new();
        entries.insert(root.key().clone(), root);

        Ok(Self {
            scheme,
            domain,
            entries,
            visited: 0,
        })
    }

    /// Network location of the site (host plus non-default port)
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn home_page(&self) -> String {
        format!("{}://{}", self.scheme, self.domain)
    }

    /// Inserts an entry unless its key is already known
    ///
    /// Returns true if the entry was added. An existing entry is left
    /// untouched, including its depth.
    pub fn insert(&mut self, entry: FrontierEntry) -> bool {
        if self.entries.contains_key(entry.key()) {
            return false;
        }
        self.entries.insert(entry.key().clone(), entry);
        true
    }

    /// Creates and inserts an entry for `url` at `depth`
    ///
    /// Returns the canonical key and whether a new entry was added.
    pub fn insert_url(&mut self, url: &str, depth: u32) -> Result<(CanonicalUrl, bool), UrlError> {
        let entry = FrontierEntry::new(url, depth)?;
        let key = entry.key().clone();
        let added = self.insert(entry);
        Ok((key, added))
    }

    /// Looks an entry up by canonical key
    pub fn get(&self, key: &str) -> Option<&FrontierEntry> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FrontierEntry> {
        self.entries.get_mut(key)
    }

    /// Looks an entry up by any absolute URL that canonicalizes to its key
    pub fn lookup(&self, url: &str) -> Option<&FrontierEntry> {
        let key = canonicalize(url).ok()?;
        self.entries.get(key.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Key of the first unvisited, fetchable entry within the depth ceiling
    ///
    /// Entries are scanned in insertion order. `None` as ceiling means
    /// unbounded depth.
    pub fn next_unvisited(&self, max_depth: Option<u32>) -> Option<CanonicalUrl> {
        self.entries
            .values()
            .find(|entry| {
                !entry.is_visited()
                    && !entry.is_unfetchable()
                    && max_depth.map_or(true, |max| entry.depth() <= max)
            })
            .map(|entry| entry.key().clone())
    }

    /// Number of digested responses, redirects and errors included
    pub fn visited(&self) -> usize {
        self.visited
    }

    pub(crate) fn record_visit(&mut self) {
        self.visited += 1;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &FrontierEntry> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut FrontierEntry> {
        self.entries.values_mut()
    }

    /// Parsed pages still held by entries
    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.entries.values().filter_map(FrontierEntry::page)
    }
}

impl<'a> IntoIterator for &'a Frontier {
    type Item = &'a FrontierEntry;
    type IntoIter = indexmap::map::Values<'a, CanonicalUrl, FrontierEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}
