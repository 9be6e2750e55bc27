use crate::config::ExportConfig;
use crate::frontier::{Frontier, FrontierEntry};
use crate::output::OutputResult;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Appends frontier entries to a JSON-lines file
///
/// Each line is `{"path": <canonical url>, "status_code": <int or null>, ...data}`.
/// The file is created on first write and only ever appended to, so running
/// the same export twice produces duplicate rows.
#[derive(Debug, Clone)]
pub struct JsonLinesExporter {
    path: PathBuf,
}

impl JsonLinesExporter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Exporter for `frontier` honouring the configured path
    ///
    /// Falls back to `<domain>.json` in the working directory.
    pub fn for_frontier(config: &ExportConfig, frontier: &Frontier) -> Self {
        match &config.path {
            Some(path) => Self::new(path),
            None => Self::new(format!("{}.json", frontier.domain())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one entry
    pub fn export(&self, entry: &FrontierEntry) -> OutputResult<()> {
        let line = entry.to_json_line()?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;

        tracing::trace!("Exported {} to {}", entry.key(), self.path.display());
        Ok(())
    }

    /// Appends every visited entry of a frontier, in insertion order
    ///
    /// Returns the number of lines written.
    pub fn export_visited(&self, frontier: &Frontier) -> OutputResult<usize> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut written = 0;
        for entry in frontier.iter().filter(|entry| entry.is_visited()) {
            writeln!(file, "{}", entry.to_json_line()?)?;
            written += 1;
        }

        Ok(written)
    }
}
