use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tessera_kernel::simulate::{simulate_table, Step};
use tessera_kernel::{Table, TableConfig};

/// Tessera table simulator
#[derive(Parser, Debug)]
#[command(name = "tessera")]
#[command(about = "Replay a commit/scan script against an in-memory table", long_about = None)]
struct Cli {
    /// Path to the script JSON (an array of steps)
    #[arg(long)]
    script: PathBuf,

    /// Path to table config JSON
    #[arg(long)]
    config: Option<PathBuf>,

    /// Also write the final table metadata to this path
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = match &cli.config {
        Some(path) => {
            let data = fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            TableConfig::from_json(&data)?
        }
        None => TableConfig::default(),
    };

    let data = fs::read_to_string(&cli.script)
        .with_context(|| format!("reading script {}", cli.script.display()))?;
    let steps: Vec<Step> = serde_json::from_str(&data).context("parsing script")?;

    let table = Table::new(config)?;
    let result = simulate_table(&table, &steps)?;

    if let Some(path) = &cli.metadata {
        fs::write(path, serde_json::to_string_pretty(&result.metadata)?)
            .with_context(|| format!("writing metadata {}", path.display()))?;
    }

    tracing::info!(
        steps = steps.len(),
        failed = result.failures().count(),
        "script finished"
    );

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
