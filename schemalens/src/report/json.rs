use std::path::Path;

use super::{ReportError, ReportWriter, write_file};
use crate::model::Database;

/// Pretty-printed JSON dump of the whole database tree.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportWriter;

impl JsonReportWriter {
    pub fn render(db: &Database) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(db)?)
    }
}

impl ReportWriter for JsonReportWriter {
    fn write_report(&self, path: &Path, db: &Database) -> Result<(), ReportError> {
        let body = Self::render(db)?;
        write_file(path, body.as_bytes())
    }

    fn report_keys(&self) -> &'static [&'static str] {
        &["json"]
    }

    fn file_extension(&self) -> &'static str {
        "json"
    }

    fn report_name(&self) -> &'static str {
        "JSON Report"
    }
}
