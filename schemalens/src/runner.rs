//! One connect → map → report cycle.

use std::path::{Path, PathBuf};

use crate::adapter::{Adapter, AdapterError};
use crate::manager::{AdapterManager, ManagerError};
use crate::report::ReportWriter;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("connection string is required (--conn or SL_CONNECTION_STRING)")]
    MissingConnectionString,
    #[error(transparent)]
    Manager(#[from] ManagerError),
    #[error(transparent)]
    Adapter(#[from] AdapterError),
    #[error("failed to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub conn: Option<String>,
    pub output_dir: PathBuf,
    /// Comma-separated writer keys, or `all`.
    pub report_types: String,
}

/// What a completed run produced.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub database: String,
    pub catalog_errors: usize,
    pub written: Vec<PathBuf>,
    pub failed_reports: usize,
}

pub struct Runner {
    manager: AdapterManager,
    writers: Vec<Box<dyn ReportWriter>>,
}

impl Runner {
    pub fn new(manager: AdapterManager, writers: Vec<Box<dyn ReportWriter>>) -> Self {
        Self { manager, writers }
    }

    /// Every selectable key, plus `all`.
    pub fn report_keys(&self) -> Vec<&'static str> {
        let mut keys: Vec<&'static str> = self
            .writers
            .iter()
            .flat_map(|w| w.report_keys().iter().copied())
            .collect();
        keys.push("all");
        keys
    }

    pub async fn run(&mut self, options: &RunOptions) -> Result<RunSummary, RunError> {
        let conn = options
            .conn
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(RunError::MissingConnectionString)?;

        let selected = select_writers(&self.writers, &options.report_types);

        let adapter = self.manager.connect(conn).await?;
        tracing::info!(adapter = %adapter.identity().signature(), "Connected");
        let mapped = map_with(adapter).await;
        if let Err(e) = self.manager.close().await {
            tracing::warn!(error = %e, "Failed to close connection");
        }
        let mapped = mapped?;

        let db = &mapped.database;
        for err in &mapped.errors {
            tracing::warn!(scope = %err.scope(), error = %err, "Catalog scan failed");
        }
        tracing::info!(
            database = %db.name(),
            schemas = db.schemas().len(),
            errors = mapped.errors.len(),
            "Mapped database"
        );

        let mut summary = RunSummary {
            database: db.name().to_string(),
            catalog_errors: mapped.errors.len(),
            ..RunSummary::default()
        };

        if selected.is_empty() {
            tracing::info!("No report types selected, skipping report generation");
            return Ok(summary);
        }
        std::fs::create_dir_all(&options.output_dir).map_err(|source| RunError::OutputDir {
            path: options.output_dir.clone(),
            source,
        })?;

        for writer in selected {
            let path = report_path(&options.output_dir, db.name(), writer);
            match writer.write_report(&path, db) {
                Ok(()) => {
                    tracing::info!(
                        report = writer.report_name(),
                        path = %path.display(),
                        "Report written"
                    );
                    summary.written.push(path);
                }
                Err(e) => {
                    tracing::error!(report = writer.report_name(), error = %e, "Report failed");
                    summary.failed_reports += 1;
                }
            }
        }
        Ok(summary)
    }
}

async fn map_with(
    adapter: &mut dyn Adapter,
) -> Result<crate::catalog::MappedDatabase, AdapterError> {
    tracing::info!("Mapping database");
    adapter.map_database().await
}

// ---------- report selection ----------

/// Resolve a `--report-types` value against the registered writers.
///
/// `all` anywhere in the list selects every writer. Unknown keys are logged
/// and ignored. Writers come back in registration order, each at most once.
pub fn select_writers<'a>(
    writers: &'a [Box<dyn ReportWriter>],
    report_types: &str,
) -> Vec<&'a dyn ReportWriter> {
    let keys: Vec<String> = report_types
        .split(',')
        .map(|k| k.trim().to_ascii_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keys.iter().any(|k| k == "all") {
        return writers.iter().map(|w| w.as_ref()).collect();
    }

    for key in &keys {
        if !writers.iter().any(|w| w.report_keys().contains(&key.as_str())) {
            tracing::warn!(report_type = %key, "Unknown report type, ignoring");
        }
    }

    writers
        .iter()
        .filter(|w| w.report_keys().iter().any(|rk| keys.iter().any(|k| k == rk)))
        .map(|w| w.as_ref())
        .collect()
}

/// `{dir}/{database}_{report name}.{ext}` with spaces in the file name replaced by `_`.
pub fn report_path(dir: &Path, database: &str, writer: &dyn ReportWriter) -> PathBuf {
    let file_name = format!(
        "{}_{}.{}",
        database,
        writer.report_name(),
        writer.file_extension()
    )
    .replace(' ', "_");
    dir.join(file_name)
}
