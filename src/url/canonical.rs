use crate::url::domain::extract_domain;
use crate::UrlError;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;
use url::Url;

/// The normalized identity of a URL inside a frontier
///
/// Always `scheme://host[:port]/path` with every trailing slash removed and
/// no query or fragment. Two URLs are the same frontier entry exactly when
/// their canonical forms are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// Lets `IndexMap<CanonicalUrl, _>` be queried with a plain `&str`.
impl Borrow<str> for CanonicalUrl {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CanonicalUrl {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalUrl {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Canonicalizes an absolute URL string into a frontier key
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed or relative
/// 2. Accept only `http` and `https`
/// 3. Keep the scheme and the lowercased host (plus a non-default port)
/// 4. Keep the path with trailing slashes trimmed
/// 5. Drop query and fragment
///
/// No relative resolution happens here; use [`make_absolute`](crate::url::make_absolute)
/// first for hrefs.
///
/// # Examples
///
/// ```
/// use sitemapper::url::canonicalize;
///
/// let key = canonicalize("https://Example.test/blog/?page=2#top").unwrap();
/// assert_eq!(key.as_str(), "https://example.test/blog");
/// ```
pub fn canonicalize(url_str: &str) -> Result<CanonicalUrl, UrlError> {
    let url =
        Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", url_str, e)))?;
    canonicalize_url(&url)
}

/// Canonicalizes an already parsed URL
pub fn canonicalize_url(url: &Url) -> Result<CanonicalUrl, UrlError> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    let netloc = extract_domain(url).ok_or_else(|| UrlError::MissingDomain(url.to_string()))?;
    let path = url.path().trim_end_matches('/');

    Ok(CanonicalUrl(format!("{}://{}{}", url.scheme(), netloc, path)))
}
