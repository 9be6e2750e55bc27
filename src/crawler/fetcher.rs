//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with timeout, proxy and header settings
//! - GET requests that never follow redirects on their own
//! - Bounded immediate retries for timeouts and dropped connections
//! - Error classification into terminal and non-terminal failures

use crate::config::ClientConfig;
use async_trait::async_trait;
use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{redirect::Policy, Client, Proxy};
use std::error::Error as StdError;
use std::io;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Status codes treated as redirects when a `Location` header is present
pub const REDIRECT_STATUS: std::ops::Range<u16> = 300..320;

/// How far a failure should propagate in a multi-site run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Environment-wide problem (bad proxy, broken client): stop everything
    Terminal,
    /// This site cannot be crawled safely: move on to the next one
    NonTerminal,
}

/// Classified fetch failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Proxy or connection failure for {url}: {message}")]
    Connection { url: String, message: String },

    #[error("TLS failure for {url}: {message}")]
    Tls { url: String, message: String },

    #[error("Request timeout for {url} after {attempts} attempts")]
    Timeout { url: String, attempts: u32 },

    #[error("Connection dropped for {url} after {attempts} attempts")]
    Disconnected { url: String, attempts: u32 },

    #[error("HTTP client error for {url}: {message}")]
    Protocol { url: String, message: String },
}

impl FetchError {
    pub fn severity(&self) -> Severity {
        match self {
            Self::Connection { .. } | Self::Protocol { .. } => Severity::Terminal,
            Self::Tls { .. } | Self::Timeout { .. } | Self::Disconnected { .. } => {
                Severity::NonTerminal
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.severity() == Severity::Terminal
    }

    /// The URL that was being fetched
    pub fn url(&self) -> &str {
        match self {
            Self::Connection { url, .. }
            | Self::Tls { url, .. }
            | Self::Timeout { url, .. }
            | Self::Disconnected { url, .. }
            | Self::Protocol { url, .. } => url,
        }
    }
}

/// A completed HTTP exchange
///
/// Either a redirect (`redirect_target` set, status in `300..320`) or a
/// terminal response. Bodies are kept for every status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    /// URL the response was served from
    pub final_url: String,

    /// HTTP status code
    pub status_code: u16,

    /// Charset the body was decoded with; the announced one when known,
    /// otherwise `utf-8`
    pub encoding: String,

    /// Body decoded with `encoding`
    pub text: String,

    /// Raw body
    pub bytes: Vec<u8>,

    /// Absolute redirect destination for 3xx responses
    pub redirect_target: Option<String>,
}

impl FetchResponse {
    /// Builds a terminal response with an HTML body
    pub fn html(final_url: impl Into<String>, status_code: u16, body: impl Into<String>) -> Self {
        let text = body.into();
        Self {
            final_url: final_url.into(),
            status_code,
            encoding: "utf-8".to_string(),
            bytes: text.as_bytes().to_vec(),
            text,
            redirect_target: None,
        }
    }

    /// Builds a redirect response pointing at an absolute `target`
    pub fn redirect(
        final_url: impl Into<String>,
        status_code: u16,
        target: impl Into<String>,
    ) -> Self {
        Self {
            redirect_target: Some(target.into()),
            ..Self::html(final_url, status_code, "")
        }
    }

    pub fn is_redirect(&self) -> bool {
        self.redirect_target.is_some()
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }
}

/// Something that can fetch one URL
///
/// `Ok(None)` means the URL could not even be requested (malformed); the
/// crawler skips such entries without counting them as visited.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Option<FetchResponse>, FetchError>;
}

/// Builds an HTTP client from the client configuration
///
/// Redirects are never followed by the client and environment proxy
/// variables are ignored; only the configured proxy is used.
///
/// # Example
///
/// ```
/// use sitemapper::config::ClientConfig;
/// use sitemapper::crawler::build_http_client;
///
/// let client = build_http_client(&ClientConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ClientConfig) -> Result<Client, reqwest::Error> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .redirect(Policy::none())
        .default_headers(build_headers(config))
        .gzip(true)
        .brotli(true);

    if let Some(user_agent) = &config.user_agent {
        builder = builder.user_agent(user_agent.as_str());
    }

    builder = match &config.proxy {
        Some(proxy) => builder.proxy(Proxy::all(proxy.as_str())?),
        None => builder.no_proxy(),
    };

    builder.build()
}

fn build_headers(config: &ClientConfig) -> HeaderMap {
    let mut headers = HeaderMap::new();

    for (name, value) in &config.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!("Ignoring invalid header {}: {}", name, value),
        }
    }

    headers
}

/// The reqwest-backed fetcher
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
}

impl HttpFetcher {
    pub fn new(config: &ClientConfig) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(config)?,
            retries: config.retries,
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, retries: u32) -> Self {
        Self { client, retries }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Fetches a URL, retrying timeouts and dropped connections
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | Malformed URL | `Ok(None)` |
    /// | Timeout | Retry immediately, then `Timeout` (non-terminal) |
    /// | Dropped connection | Retry immediately, then `Disconnected` (non-terminal) |
    /// | TLS/certificate error | Immediate `Tls` (non-terminal) |
    /// | Proxy/connect error | Immediate `Connection` (terminal) |
    /// | Anything else | Immediate `Protocol` (terminal) |
    ///
    /// With `retries = n` at most `n + 1` requests are sent.
    pub async fn fetch_with_retries(
        &self,
        url: &str,
        retries: u32,
    ) -> Result<Option<FetchResponse>, FetchError> {
        let Some(parsed) = parse_request_url(url) else {
            tracing::debug!("Not fetching malformed URL: {}", url);
            return Ok(None);
        };

        let mut remaining = retries;
        let mut attempts = 0;

        loop {
            attempts += 1;

            let err = match self.attempt(parsed.clone()).await {
                Ok(response) => return Ok(Some(response)),
                Err(err) => err,
            };

            let class = classify(&err);
            let message = err.to_string();

            match class {
                ErrorClass::InvalidUrl => {
                    tracing::debug!("Request for {} rejected by client: {}", url, message);
                    return Ok(None);
                }
                ErrorClass::Timeout | ErrorClass::Disconnected if remaining > 0 => {
                    remaining -= 1;
                    tracing::warn!(
                        "Retrying {} after {:?} ({} retries left)",
                        url,
                        class,
                        remaining
                    );
                }
                ErrorClass::Timeout => {
                    return Err(FetchError::Timeout {
                        url: url.to_string(),
                        attempts,
                    })
                }
                ErrorClass::Disconnected => {
                    return Err(FetchError::Disconnected {
                        url: url.to_string(),
                        attempts,
                    })
                }
                ErrorClass::Tls => {
                    return Err(FetchError::Tls {
                        url: url.to_string(),
                        message,
                    })
                }
                ErrorClass::Connection => {
                    return Err(FetchError::Connection {
                        url: url.to_string(),
                        message,
                    })
                }
                ErrorClass::Protocol => {
                    return Err(FetchError::Protocol {
                        url: url.to_string(),
                        message,
                    })
                }
            }
        }
    }

    async fn attempt(&self, url: Url) -> Result<FetchResponse, reqwest::Error> {
        let response = self.client.get(url).send().await?;

        let status_code = response.status().as_u16();
        let final_url = response.url().clone();

        let redirect_target = if REDIRECT_STATUS.contains(&status_code) {
            response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|location| final_url.join(location).ok())
                .map(|target| target.to_string())
        } else {
            None
        };

        let charset = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(charset_of);

        let bytes = response.bytes().await?.to_vec();
        let (text, encoding) = decode_body(&bytes, charset.as_deref());

        Ok(FetchResponse {
            final_url: final_url.to_string(),
            status_code,
            encoding,
            text,
            bytes,
            redirect_target,
        })
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Option<FetchResponse>, FetchError> {
        self.fetch_with_retries(url, self.retries).await
    }
}

/// Returns true if `url` is an absolute http(s) URL with a host
pub fn is_fetchable(url: &str) -> bool {
    parse_request_url(url).is_some()
}

fn parse_request_url(url: &str) -> Option<Url> {
    let parsed = Url::parse(url.trim()).ok()?;
    let fetchable =
        (parsed.scheme() == "http" || parsed.scheme() == "https") && parsed.host_str().is_some();
    fetchable.then_some(parsed)
}

fn charset_of(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_lowercase())
    })
}

/// Decodes a body with the announced charset, falling back to UTF-8 for
/// missing or unknown labels
///
/// Returns the text and the charset label that was used.
fn decode_body(bytes: &[u8], charset: Option<&str>) -> (String, String) {
    let (encoding, label) = match charset.and_then(|c| Encoding::for_label(c.as_bytes())) {
        Some(encoding) => (encoding, charset.unwrap_or("utf-8").to_string()),
        None => (UTF_8, "utf-8".to_string()),
    };

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!("Body is not valid {}; replaced malformed sequences", label);
    }

    (text.into_owned(), label)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    InvalidUrl,
    Timeout,
    Disconnected,
    Tls,
    Connection,
    Protocol,
}

/// Sorts a request failure into a retry/severity class
///
/// Only the causes are inspected, never the top-level error: its message
/// carries the request URL, which may contain any word.
fn classify(err: &reqwest::Error) -> ErrorClass {
    let cause = err.source();
    let in_causes = |check: fn(&(dyn StdError + 'static)) -> bool| cause.map_or(false, check);

    if err.is_builder() {
        ErrorClass::InvalidUrl
    } else if err.is_timeout() || in_causes(is_timeout) {
        ErrorClass::Timeout
    } else if in_causes(mentions_tls) || (err.is_connect() && in_causes(is_invalid_data)) {
        ErrorClass::Tls
    } else if err.is_connect() {
        ErrorClass::Connection
    } else if in_causes(is_disconnect) {
        ErrorClass::Disconnected
    } else {
        ErrorClass::Protocol
    }
}

fn source_chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |e| (*e).source())
}

fn has_io_kind(err: &(dyn StdError + 'static), kinds: &[io::ErrorKind]) -> bool {
    source_chain(err).any(|e| {
        e.downcast_ref::<io::Error>()
            .map(|io_err| kinds.contains(&io_err.kind()))
            .unwrap_or(false)
    })
}

fn is_timeout(err: &(dyn StdError + 'static)) -> bool {
    has_io_kind(err, &[io::ErrorKind::TimedOut])
}

/// rustls reports handshake failures as `InvalidData` I/O errors
fn is_invalid_data(err: &(dyn StdError + 'static)) -> bool {
    has_io_kind(err, &[io::ErrorKind::InvalidData])
}

fn mentions_tls(err: &(dyn StdError + 'static)) -> bool {
    source_chain(err).any(|e| {
        let message = e.to_string().to_lowercase();
        ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| message.contains(needle))
    })
}

fn is_disconnect(err: &(dyn StdError + 'static)) -> bool {
    has_io_kind(
        err,
        &[
            io::ErrorKind::ConnectionReset,
            io::ErrorKind::ConnectionAborted,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::UnexpectedEof,
        ],
    ) || source_chain(err).any(|e| {
        let message = e.to_string().to_lowercase();
        message.contains("connection closed before message completed")
            || message.contains("incomplete message")
            || message.contains("connection reset")
    })
}
