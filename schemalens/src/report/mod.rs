//! Report writers: render a mapped [`Database`] to a file.
//!
//! Each writer advertises the keys it answers to on the command line
//! (`--report-types json,mermaid`), the file extension it produces and a
//! human-readable name that also becomes part of the output file name.

use std::path::{Path, PathBuf};

use crate::model::Database;

pub mod json;
pub mod mermaid;

pub use json::JsonReportWriter;
pub use mermaid::MermaidReportWriter;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub trait ReportWriter: Send + Sync {
    /// Write the report for `db` to `path`, replacing any existing file.
    fn write_report(&self, path: &Path, db: &Database) -> Result<(), ReportError>;

    /// Lowercase selector keys this writer answers to.
    fn report_keys(&self) -> &'static [&'static str];

    fn file_extension(&self) -> &'static str;

    fn report_name(&self) -> &'static str;
}

/// The built-in writers, in output order.
pub fn default_writers() -> Vec<Box<dyn ReportWriter>> {
    vec![Box::new(JsonReportWriter), Box::new(MermaidReportWriter)]
}

fn write_file(path: &Path, contents: &[u8]) -> Result<(), ReportError> {
    std::fs::write(path, contents).map_err(|source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
