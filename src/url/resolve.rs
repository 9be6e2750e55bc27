use crate::UrlError;
use url::Url;

/// Makes an href absolute against the URL of the page it appeared on
///
/// Relative paths are joined onto `base`. Protocol-relative links
/// (`//host/path`) take the base URL's scheme. Absolute links are returned
/// as parsed.
///
/// # Examples
///
/// ```
/// use sitemapper::url::make_absolute;
/// use url::Url;
///
/// let base = Url::parse("https://example.test/blog/post").unwrap();
/// assert_eq!(make_absolute("other", &base).unwrap().as_str(), "https://example.test/blog/other");
/// assert_eq!(make_absolute("//cdn.test/x", &base).unwrap().as_str(), "https://cdn.test/x");
/// ```
pub fn make_absolute(href: &str, base: &Url) -> Result<Url, UrlError> {
    base.join(href.trim())
        .map_err(|e| UrlError::Parse(format!("{}: {}", href, e)))
}
