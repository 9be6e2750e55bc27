//! URL handling module
//!
//! This module provides canonicalization (the frontier's dedup key), link
//! absolutization, and host extraction for internal/external classification.

mod canonical;
mod domain;
mod resolve;

// Re-export main functions
pub use canonical::{canonicalize, canonicalize_url, CanonicalUrl};
pub use domain::{extract_domain, on_site, same_site, site_of};
pub use resolve::make_absolute;
