//! Frontier entry definitions
//!
//! One entry exists per canonical URL. An entry is "visited" exactly when it
//! carries an HTTP status code.

use crate::page::Page;
use crate::url::{canonicalize, CanonicalUrl};
use crate::UrlError;
use serde_json::{Map, Value};

/// One known URL of a site crawl
#[derive(Debug, Clone)]
pub struct FrontierEntry {
    key: CanonicalUrl,
    raw_url: String,
    depth: u32,
    status: Option<u16>,
    page: Option<Page>,
    redirect_target: Option<CanonicalUrl>,
    unfetchable: bool,

    /// Caller-extensible bag for extraction results, exported with the entry
    pub data: Map<String, Value>,
}

impl FrontierEntry {
    /// Creates an unvisited entry for an absolute URL
    ///
    /// # Returns
    ///
    /// * `Ok(FrontierEntry)` - Entry keyed by the canonical form of `url`
    /// * `Err(UrlError)` - `url` is relative, malformed or not HTTP(S)
    pub fn new(url: &str, depth: u32) -> Result<Self, UrlError> {
        let key = canonicalize(url)?;

        Ok(Self {
            key,
            raw_url: url.trim().to_string(),
            depth,
            status: None,
            page: None,
            redirect_target: None,
            unfetchable: false,
            data: Map::new(),
        })
    }

    /// The canonical key identifying this entry
    pub fn key(&self) -> &CanonicalUrl {
        &self.key
    }

    /// The URL as it was first discovered, used for fetching
    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Lowers the depth if `depth` is smaller than the current one
    ///
    /// Returns true if the depth changed. Depth never increases.
    pub fn lower_depth(&mut self, depth: u32) -> bool {
        if depth < self.depth {
            self.depth = depth;
            true
        } else {
            false
        }
    }

    /// HTTP status code, `None` until the entry is visited
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn is_visited(&self) -> bool {
        self.status.is_some()
    }

    /// True if the URL could not even be requested and will never be selected
    pub fn is_unfetchable(&self) -> bool {
        self.unfetchable
    }

    /// The parsed page, present after a `200` until evicted
    pub fn page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Canonical key of the redirect destination, set for 3xx responses
    pub fn redirect_target(&self) -> Option<&CanonicalUrl> {
        self.redirect_target.as_ref()
    }

    /// Drops the parsed page to bound memory; status and data are kept
    pub fn evict_page(&mut self) -> Option<Page> {
        self.page.take()
    }

    /// Stores an extraction result under `key`
    pub fn insert_data(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    /// Renders the export record `{"path", "status_code", ...data}`
    ///
    /// Keys in `data` override `path` and `status_code`.
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        let mut record = Map::new();
        record.insert("path".to_string(), Value::String(self.key.to_string()));
        record.insert(
            "status_code".to_string(),
            self.status.map(Value::from).unwrap_or(Value::Null),
        );
        record.extend(self.data.iter().map(|(k, v)| (k.clone(), v.clone())));

        serde_json::to_string(&Value::Object(record))
    }

    pub(crate) fn set_status(&mut self, status: u16) {
        self.status = Some(status);
    }

    pub(crate) fn set_page(&mut self, page: Page) {
        self.page = Some(page);
    }

    pub(crate) fn set_redirect_target(&mut self, target: CanonicalUrl) {
        self.redirect_target = Some(target);
    }

    pub(crate) fn mark_unfetchable(&mut self) {
        self.unfetchable = true;
    }
}

// Identity is the canonical key only.
impl PartialEq for FrontierEntry {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for FrontierEntry {}

impl std::hash::Hash for FrontierEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}
