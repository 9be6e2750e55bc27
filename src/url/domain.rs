use url::Url;

/// Extracts the network location (host plus any non-default port) from a URL
///
/// The host is lowercased by the URL parser; default ports are dropped, so
/// `https://example.test:443/` and `https://example.test/` share a netloc.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sitemapper::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.test/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.test".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Strips a leading `www.` from a netloc
///
/// `www.example.test` and `example.test` are one site; other subdomains are
/// separate sites.
pub fn site_of(netloc: &str) -> &str {
    netloc.strip_prefix("www.").unwrap_or(netloc)
}

/// Returns true if `url` belongs to the site with the given netloc
pub fn on_site(url: &Url, netloc: &str) -> bool {
    extract_domain(url)
        .map(|domain| site_of(&domain) == site_of(netloc))
        .unwrap_or(false)
}

/// Returns true if both URLs live on the same site
///
/// Netlocs are compared with any `www.` prefix removed.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match extract_domain(b) {
        Some(b) => on_site(a, &b),
        None => false,
    }
}
