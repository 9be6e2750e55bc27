//! Crawl engine - main crawl loop
//!
//! The engine mediates between the frontier and the fetcher. One step
//! handles exactly one frontier entry:
//!
//! 1. Select the first unvisited entry within the depth ceiling
//! 2. Stop if the page budget is used up
//! 3. Fetch it (malformed URLs are skipped, failures propagate)
//! 4. Digest the response into the frontier
//! 5. Hand `200` pages to the caller's handler
//! 6. Export and/or evict the entry
//!
//! Fetches never overlap; the only suspension points are the fetch and the
//! optional politeness sleep.

use crate::config::{Config, CrawlerConfig, ExportConfig};
use crate::crawler::digest::{digest_response, Digest, DigestOptions};
use crate::crawler::fetcher::{is_fetchable, Fetch, HttpFetcher};
use crate::crawler::handler::{Flow, PageHandler};
use crate::frontier::Frontier;
use crate::output::JsonLinesExporter;
use crate::CrawlError;
use std::time::Duration;

/// How a crawl that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlOutcome {
    /// No unvisited entry within the depth ceiling is left
    Exhausted,

    /// `max_pages` responses were digested
    BudgetReached,

    /// The page handler asked to stop
    Stopped,
}

/// Single-site crawl engine
pub struct Crawler<F> {
    fetcher: F,
    config: CrawlerConfig,
    export: ExportConfig,
}

impl Crawler<HttpFetcher> {
    /// Builds a crawler with an HTTP fetcher from a full configuration
    ///
    /// # Example
    ///
    /// ```no_run
    /// use sitemapper::{Config, Crawler, Frontier};
    ///
    /// # async fn example() -> Result<(), sitemapper::CrawlError> {
    /// let crawler = Crawler::from_config(&Config::default())?;
    /// let mut frontier = Frontier::new("https://example.test/")?;
    /// let outcome = crawler.build(&mut frontier).await?;
    /// println!("{:?}: {} pages visited", outcome, frontier.visited());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_config(config: &Config) -> Result<Self, CrawlError> {
        let fetcher = HttpFetcher::new(&config.client)?;
        Ok(Self::new(fetcher, config.crawler.clone()).with_export(config.export.clone()))
    }
}

impl<F: Fetch> Crawler<F> {
    pub fn new(fetcher: F, config: CrawlerConfig) -> Self {
        Self {
            fetcher,
            config,
            export: ExportConfig::default(),
        }
    }

    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Crawls the frontier without a page handler
    pub async fn build(&self, frontier: &mut Frontier) -> Result<CrawlOutcome, CrawlError> {
        self.crawl(frontier, None).await
    }

    /// Crawls the frontier, handing every `200` page to `handler`
    pub async fn run<H: PageHandler>(
        &self,
        frontier: &mut Frontier,
        handler: &mut H,
    ) -> Result<CrawlOutcome, CrawlError> {
        self.crawl(frontier, Some(handler)).await
    }

    async fn crawl(
        &self,
        frontier: &mut Frontier,
        mut handler: Option<&mut dyn PageHandler>,
    ) -> Result<CrawlOutcome, CrawlError> {
        let exporter = self
            .export
            .enabled
            .then(|| JsonLinesExporter::for_frontier(&self.export, frontier));

        let options = DigestOptions {
            follow_links: self.config.follow_links,
            excluded_extensions: &self.config.excluded_extensions,
        };

        tracing::info!(
            "Starting crawl of {} (max depth: {:?}, max pages: {})",
            frontier.domain(),
            self.config.max_depth,
            self.config.max_pages
        );

        let mut delay_pending = false;

        let outcome = loop {
            let Some(key) = frontier.next_unvisited(self.config.max_depth) else {
                tracing::debug!("No unvisited entries left");
                break CrawlOutcome::Exhausted;
            };

            if frontier.visited() >= self.config.max_pages {
                tracing::debug!("Page budget of {} reached", self.config.max_pages);
                break CrawlOutcome::BudgetReached;
            }

            let Some(raw_url) = frontier.get(key.as_str()).map(|e| e.raw_url().to_string())
            else {
                break CrawlOutcome::Exhausted;
            };

            tracing::trace!("Selected {}", key);

            if !is_fetchable(&raw_url) {
                tracing::warn!("Skipping unfetchable URL: {}", raw_url);
                if let Some(entry) = frontier.get_mut(key.as_str()) {
                    entry.mark_unfetchable();
                }
                continue;
            }

            // Only owed once a request went out
            if delay_pending && self.config.sleep_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.sleep_ms)).await;
            }
            delay_pending = false;

            let response = match self.fetcher.fetch(&raw_url).await {
                Ok(Some(response)) => {
                    delay_pending = true;
                    response
                }
                Ok(None) => {
                    tracing::warn!("Skipping unfetchable URL: {}", raw_url);
                    if let Some(entry) = frontier.get_mut(key.as_str()) {
                        entry.mark_unfetchable();
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!(
                        "Abandoning crawl of {} ({:?}): {}",
                        frontier.domain(),
                        e.severity(),
                        e
                    );
                    return Err(e.into());
                }
            };

            let digest = digest_response(frontier, key.as_str(), &response, &options);
            tracing::debug!("Fetched {} [{}]: {:?}", raw_url, response.status_code, digest);

            let flow = match (handler.as_deref_mut(), &digest) {
                (Some(handler), Some(Digest::Parsed { .. })) => {
                    handler.handle(frontier, &key, &response)
                }
                _ => Flow::Continue,
            };

            if let (Some(exporter), Some(entry)) = (&exporter, frontier.get(key.as_str())) {
                exporter.export(entry)?;
            }

            if self.config.delete_pages_after_visit {
                if let Some(entry) = frontier.get_mut(key.as_str()) {
                    entry.evict_page();
                }
            }

            if flow == Flow::Stop {
                tracing::info!("Page handler stopped the crawl at {}", key);
                break CrawlOutcome::Stopped;
            }
        };

        tracing::info!(
            "Crawl of {} finished ({:?}): {} visited, {} known",
            frontier.domain(),
            outcome,
            frontier.visited(),
            frontier.len()
        );

        Ok(outcome)
    }
}
