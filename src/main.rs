use anyhow::Result;
use clap::Parser;
use replication_ingest::config::{get_config, load_config};
use replication_ingest::enrich::MergeEngine;
use replication_ingest::pipeline::{self, IngestOptions};
use replication_ingest::sources::SourceRegistry;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Replication Ingest - enrich citation pairs and append them to the
/// replications database
#[derive(Parser, Debug)]
#[command(name = "replication-ingest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Ingest replication study records into the master database", long_about = None)]
struct Cli {
    /// Input CSV file to ingest
    input_csv: PathBuf,

    /// Master database CSV file
    master_csv: PathBuf,

    /// Skip metadata enrichment API calls (faster but no metadata updates)
    #[arg(long)]
    skip_api_calls: bool,

    /// Data dictionary CSV controlling column projection and order
    #[arg(long)]
    data_dictionary: Option<PathBuf>,

    /// Version history log file
    #[arg(long)]
    version_history: Option<PathBuf>,

    /// Directory the timestamped output database is written into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Pause between provider calls, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Contact email sent to providers that ask for one
    #[arg(long)]
    email: Option<String>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

fn init_logging(verbose: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("replication_ingest={}", default_level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => get_config(),
    };
    if let Some(email) = cli.email {
        config.email = email;
    }
    if let Some(delay_ms) = cli.delay_ms {
        config.call_delay_ms = delay_ms;
    }
    if let Some(path) = cli.data_dictionary {
        config.data_dictionary = path;
    }
    if let Some(path) = cli.version_history {
        config.version_history = path;
    }

    let registry = SourceRegistry::new(&config.email);
    let engine = MergeEngine::new(registry).with_delay(config.call_delay());
    let options = IngestOptions {
        skip_api_calls: cli.skip_api_calls,
        data_dictionary: config.data_dictionary.clone(),
        version_history: config.version_history.clone(),
        output_dir: cli.output_dir,
        entity_delay: config.entity_delay(),
    };

    let report = pipeline::ingest(&cli.input_csv, &cli.master_csv, &engine, &options).await?;

    println!("Ingestion complete");
    println!("  Input rows:         {}", report.input_rows);
    println!("  Duplicates skipped: {}", report.duplicates_skipped);
    println!("  New rows added:     {}", report.rows_appended);
    println!("  Total rows:         {}", report.total_rows);
    println!("  Output file:        {}", report.output_path.display());

    Ok(())
}
