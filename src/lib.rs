//! Sitemapper: a bounded single-site crawl engine
//!
//! This crate walks one website's page graph breadth-first under depth and
//! page-count budgets, keeping a deduplicated, depth-annotated frontier of
//! canonical URLs and handing every visited page to caller-supplied
//! extraction logic.

pub mod config;
pub mod crawler;
pub mod frontier;
pub mod output;
pub mod page;
pub mod url;

use thiserror::Error;

pub use crawler::{FetchError, Severity};
pub use output::OutputError;

/// Main error type for crawl operations
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

impl CrawlError {
    /// Returns how far this error should propagate in a multi-site run
    ///
    /// Export failures and HTTP clients that cannot be built point at the
    /// local environment and are treated as terminal. URL and configuration
    /// errors happen before any crawling starts and carry no severity.
    pub fn severity(&self) -> Option<Severity> {
        match self {
            Self::Fetch(e) => Some(e.severity()),
            Self::Output(_) | Self::Client(_) => Some(Severity::Terminal),
            Self::Url(_) | Self::Config(_) => None,
        }
    }

    /// Returns true if the whole multi-site run should stop
    pub fn is_terminal(&self) -> bool {
        self.severity() == Some(Severity::Terminal)
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL: {0}")]
    MissingDomain(String),
}

/// Result type alias for crawl operations
pub type Result<T> = std::result::Result<T, CrawlError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlOutcome, Crawler, Fetch, FetchResponse, Flow, HttpFetcher, PageHandler};
pub use frontier::{Frontier, FrontierEntry};
pub use page::{Link, Page};
pub use url::{canonicalize, make_absolute, CanonicalUrl};
