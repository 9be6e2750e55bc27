//! Crawler module for single-site crawling
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and redirect policy
//! - Digesting responses into the frontier
//! - The crawl loop and its budgets
//! - Seeding the frontier from sitemaps

mod digest;
mod engine;
mod fetcher;
mod handler;
mod seeder;

pub use digest::{digest_response, Digest, DigestOptions};
pub use engine::{CrawlOutcome, Crawler};
pub use fetcher::{
    build_http_client, is_fetchable, Fetch, FetchError, FetchResponse, HttpFetcher, Severity,
    REDIRECT_STATUS,
};
pub use handler::{Flow, PageHandler};
pub use seeder::{parse_sitemap, seed_sitemap, SITEMAP_DEPTH};
