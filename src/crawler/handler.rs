//! Per-page extraction callbacks

use crate::crawler::fetcher::FetchResponse;
use crate::frontier::Frontier;
use crate::url::CanonicalUrl;

/// Whether the crawl should go on after a page was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flow {
    #[default]
    Continue,
    Stop,
}

impl From<bool> for Flow {
    /// `true` means "stop"
    fn from(stop: bool) -> Self {
        if stop {
            Flow::Stop
        } else {
            Flow::Continue
        }
    }
}

/// Caller-supplied extraction logic, invoked for every `200` page
///
/// The entry lives inside the frontier; look it up with `key`:
///
/// ```
/// use sitemapper::{FetchResponse, Flow, Frontier, PageHandler};
/// use sitemapper::url::CanonicalUrl;
///
/// struct Titles;
///
/// impl PageHandler for Titles {
///     fn handle(&mut self, frontier: &mut Frontier, key: &CanonicalUrl, _: &FetchResponse) -> Flow {
///         if let Some(entry) = frontier.get_mut(key.as_str()) {
///             if let Some(title) = entry.page().and_then(|page| page.title()) {
///                 entry.insert_data("title", title);
///             }
///         }
///         Flow::Continue
///     }
/// }
/// ```
///
/// Closures with the same signature implement the trait too.
pub trait PageHandler: Send {
    fn handle(
        &mut self,
        frontier: &mut Frontier,
        key: &CanonicalUrl,
        response: &FetchResponse,
    ) -> Flow;
}

impl<F> PageHandler for F
where
    F: FnMut(&mut Frontier, &CanonicalUrl, &FetchResponse) -> Flow + Send,
{
    fn handle(
        &mut self,
        frontier: &mut Frontier,
        key: &CanonicalUrl,
        response: &FetchResponse,
    ) -> Flow {
        self(frontier, key, response)
    }
}
