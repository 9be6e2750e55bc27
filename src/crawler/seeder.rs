//! Sitemap seeding
//!
//! Reads `<url><loc>` locations out of a sitemap document and inserts them
//! into the frontier at [`SITEMAP_DEPTH`]. Parsing is lenient: namespaces are
//! ignored and a malformed document yields the locations read before the
//! first error.

use crate::crawler::engine::Crawler;
use crate::crawler::fetcher::Fetch;
use crate::frontier::Frontier;
use crate::CrawlError;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Depth given to seeded entries, deep enough to stay out of shallow
/// link-following passes
pub const SITEMAP_DEPTH: u32 = 10;

/// Extracts every `<url><loc>` location from a sitemap document
pub fn parse_sitemap(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    reader.trim_text(true);
    reader.check_end_names(false);

    let mut locations = Vec::new();
    let mut buf = Vec::new();
    let mut in_url = false;
    let mut in_loc = false;
    let mut current = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"url" => in_url = true,
                b"loc" if in_url => {
                    in_loc = true;
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"url" => in_url = false,
                b"loc" if in_loc => {
                    in_loc = false;
                    let location = current.trim();
                    if !location.is_empty() {
                        locations.push(location.to_string());
                    }
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_loc => match t.unescape() {
                Ok(text) => current.push_str(&text),
                Err(_) => current.push_str(&String::from_utf8_lossy(&t)),
            },
            Ok(Event::CData(c)) if in_loc => {
                current.push_str(&String::from_utf8_lossy(&c.into_inner()));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!(
                    "Sitemap parse error at position {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    locations
}

/// Inserts the sitemap's locations into the frontier
///
/// With a `filter`, only locations containing it are seeded. Returns the
/// number of new entries.
pub fn seed_sitemap(frontier: &mut Frontier, xml: &[u8], filter: Option<&str>) -> usize {
    let mut added = 0;

    for location in parse_sitemap(xml) {
        if let Some(filter) = filter {
            if !location.contains(filter) {
                continue;
            }
        }

        match frontier.insert_url(&location, SITEMAP_DEPTH) {
            Ok((_, true)) => added += 1,
            Ok((_, false)) => {}
            Err(e) => tracing::debug!("Skipping sitemap location {}: {}", location, e),
        }
    }

    tracing::debug!("Seeded {} entries from sitemap", added);
    added
}

impl<F: Fetch> Crawler<F> {
    /// Fetches the sitemap at `url` and seeds the frontier from it
    ///
    /// A malformed `url` or a non-200 answer seeds nothing. Fetch failures
    /// propagate like they do during a crawl.
    pub async fn seed_from_sitemap(
        &self,
        frontier: &mut Frontier,
        url: &str,
        filter: Option<&str>,
    ) -> Result<usize, CrawlError> {
        let Some(response) = self.fetcher().fetch(url).await? else {
            tracing::warn!("Skipping unfetchable sitemap URL: {}", url);
            return Ok(0);
        };

        if !response.is_ok() {
            tracing::warn!("Sitemap {} answered {}", url, response.status_code);
            return Ok(0);
        }

        Ok(seed_sitemap(frontier, &response.bytes, filter))
    }
}
