//! Output module for exporting crawl results
//!
//! Visited entries are exported as line-delimited JSON, one object per line,
//! appended to a file.

mod jsonl;

pub use jsonl::JsonLinesExporter;

use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;
