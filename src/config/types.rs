use serde::Deserialize;
use std::collections::HashMap;

/// File extensions whose links are not added to the frontier by default
pub const DEFAULT_EXCLUDED_EXTENSIONS: &[&str] = &[
    ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".zip", ".doc", ".docx", ".xls",
    ".xlsx", ".ppt", ".pptx", ".mp3", ".mp4",
];

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub client: ClientConfig,
    pub export: ExportConfig,
}

/// Crawl loop configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Deepest entry that may be fetched; unbounded when absent
    #[serde(rename = "max-depth")]
    pub max_depth: Option<u32>,

    /// Maximum number of responses digested in one crawl
    #[serde(rename = "max-pages")]
    pub max_pages: usize,

    /// Politeness delay between consecutive fetches (milliseconds)
    #[serde(rename = "sleep-ms")]
    pub sleep_ms: u64,

    /// Add internal links of visited pages to the frontier
    #[serde(rename = "follow-links")]
    pub follow_links: bool,

    /// Drop parsed pages once they have been handled and exported
    #[serde(rename = "delete-pages-after-visit")]
    pub delete_pages_after_visit: bool,

    /// Link suffixes (lowercase, with leading dot) never added to the frontier
    #[serde(rename = "excluded-extensions")]
    pub excluded_extensions: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_pages: 20,
            sleep_ms: 0,
            follow_links: true,
            delete_pages_after_visit: false,
            excluded_extensions: DEFAULT_EXCLUDED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Total request timeout (milliseconds)
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,

    /// Immediate retries after a timeout or dropped connection
    pub retries: u32,

    /// Upstream proxy URL for all requests
    pub proxy: Option<String>,

    /// User-Agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: Option<String>,

    /// Extra headers sent with every request
    pub headers: HashMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 15_000,
            retries: 0,
            proxy: None,
            user_agent: None,
            headers: HashMap::new(),
        }
    }
}

/// Export configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Append one JSON line per visited entry
    pub enabled: bool,

    /// Output file; `<domain>.json` in the working directory when absent
    pub path: Option<String>,
}
