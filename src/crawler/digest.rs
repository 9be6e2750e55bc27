//! Response digestion
//!
//! Interprets one fetch response for one frontier entry and updates the
//! frontier accordingly. Every digested response counts as one visit.

use crate::crawler::fetcher::FetchResponse;
use crate::frontier::{Frontier, FrontierEntry};
use crate::page::Page;
use crate::url::{canonicalize, on_site, CanonicalUrl};
use url::Url;

/// Knobs for one digestion call
#[derive(Debug, Clone, Copy)]
pub struct DigestOptions<'a> {
    /// Add internal links of a `200` page at `depth + 1`
    pub follow_links: bool,

    /// Lowercase link suffixes that are never added
    pub excluded_extensions: &'a [String],
}

/// What digestion did with a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Digest {
    /// 3xx with a destination; the target entry shares the source depth
    Redirected { target: Option<CanonicalUrl> },

    /// 200; the page was parsed and `discovered` new entries were added
    Parsed { discovered: usize },

    /// Any other status; only the status was recorded
    Status(u16),
}

/// Digests `response` into the entry stored under `key`
///
/// Returns `None` (and counts nothing) if `key` is not in the frontier.
pub fn digest_response(
    frontier: &mut Frontier,
    key: &str,
    response: &FetchResponse,
    options: &DigestOptions<'_>,
) -> Option<Digest> {
    let (depth, raw_url) = {
        let entry = frontier.get(key)?;
        (entry.depth(), entry.raw_url().to_string())
    };

    frontier.record_visit();

    if let Some(target) = response.redirect_target.as_deref() {
        let target_key = match canonicalize(target) {
            Ok(target_key) => {
                if let Ok(target_entry) = FrontierEntry::new(target, depth) {
                    frontier.insert(target_entry);
                }
                Some(target_key)
            }
            Err(e) => {
                tracing::debug!("Ignoring redirect target {} from {}: {}", target, key, e);
                None
            }
        };

        if let Some(entry) = frontier.get_mut(key) {
            entry.set_status(response.status_code);
            if let Some(target_key) = &target_key {
                entry.set_redirect_target(target_key.clone());
            }
        }

        return Some(Digest::Redirected { target: target_key });
    }

    if response.status_code != 200 {
        if let Some(entry) = frontier.get_mut(key) {
            entry.set_status(response.status_code);
        }
        return Some(Digest::Status(response.status_code));
    }

    let base = match Url::parse(&response.final_url).or_else(|_| Url::parse(&raw_url)) {
        Ok(base) => base,
        Err(e) => {
            tracing::debug!("Cannot parse page URL for {}: {}", key, e);
            if let Some(entry) = frontier.get_mut(key) {
                entry.set_status(response.status_code);
            }
            return Some(Digest::Parsed { discovered: 0 });
        }
    };

    let page = Page::parse(&response.text, base);

    let links: Vec<String> = if options.follow_links {
        page.internal_links()
            .map(|link| link.absolute_url.clone())
            .filter(|link| is_on_site(link, frontier.domain()))
            .filter(|link| !is_excluded(link, options.excluded_extensions))
            .collect()
    } else {
        Vec::new()
    };

    if let Some(entry) = frontier.get_mut(key) {
        entry.set_status(response.status_code);
        entry.set_page(page);
    }

    let mut discovered = 0;
    for link in links {
        match FrontierEntry::new(&link, depth + 1) {
            Ok(new_entry) => {
                if frontier.insert(new_entry) {
                    discovered += 1;
                }
            }
            Err(e) => tracing::debug!("Skipping link {}: {}", link, e),
        }
    }

    Some(Digest::Parsed { discovered })
}

/// Links found on pages of other sites (e.g. after an off-site redirect)
/// are never followed; `www.` and bare hosts count as one site.
fn is_on_site(link: &str, domain: &str) -> bool {
    Url::parse(link)
        .map(|url| on_site(&url, domain))
        .unwrap_or(false)
}

fn is_excluded(link: &str, excluded_extensions: &[String]) -> bool {
    let Ok(url) = Url::parse(link) else {
        return true;
    };
    let path = url.path().to_lowercase();

    excluded_extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_lowercase()))
}
