use std::path::PathBuf;

use clap::Parser;
use schemalens::adapter::default_adapters;
use schemalens::manager::AdapterManager;
use schemalens::report::default_writers;
use schemalens::runner::{RunOptions, Runner};

#[derive(Parser)]
#[command(
    name = "schemalens",
    about = "Map a live database catalog and write inventory reports"
)]
struct Cli {
    /// Database connection string (falls back to SL_CONNECTION_STRING)
    #[arg(long)]
    conn: Option<String>,

    /// Directory to write reports to
    #[arg(long, default_value = "./schemalens/")]
    output_dir: PathBuf,

    /// Comma-separated report types (json, mermaid, all)
    #[arg(long, default_value = "all")]
    report_types: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Init structured logging (respects RUST_LOG; defaults to info)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let options = RunOptions {
        conn: cli
            .conn
            .or_else(|| std::env::var("SL_CONNECTION_STRING").ok()),
        output_dir: cli.output_dir,
        report_types: cli.report_types,
    };

    let mut runner = Runner::new(AdapterManager::new(default_adapters()), default_writers());
    let summary = runner.run(&options).await?;

    tracing::info!(
        database = %summary.database,
        reports = summary.written.len(),
        catalog_errors = summary.catalog_errors,
        "Done"
    );
    if summary.failed_reports > 0 {
        return Err(format!("{} report(s) failed", summary.failed_reports).into());
    }
    Ok(())
}
