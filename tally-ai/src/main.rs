//! tally-ai - command-line entry point
//!
//! Reads one raw generator response from a file or stdin, runs the ingest
//! pipeline and prints the repaired record with its diagnostic report as
//! JSON on stdout. Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tally_ai::Pipeline;
use tally_common::config::TallyConfig;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tally-ai
#[derive(Parser, Debug)]
#[command(name = "tally-ai")]
#[command(about = "Repair and reconcile machine-generated cost breakdowns")]
#[command(version)]
struct Args {
    /// File holding the raw response (stdin when omitted or `-`)
    input: Option<PathBuf>,

    /// Configuration file (overrides TALLY_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print only the diagnostic report
    #[arg(long)]
    report_only: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = TallyConfig::resolve(args.config.as_deref()).context("Failed to load configuration")?;

    // Initialize tracing (RUST_LOG wins over the configured level)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let raw = read_input(args.input.as_ref())?;
    info!(bytes = raw.len(), "Input read");

    let pipeline = Pipeline::new(&config);
    let analysis = pipeline.process(&raw).context("Failed to process cost breakdown")?;

    let output = if args.report_only {
        to_json(&analysis.report, args.pretty)?
    } else {
        to_json(&analysis, args.pretty)?
    };
    println!("{}", output);

    Ok(())
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut raw = String::new();
            std::io::stdin()
                .read_to_string(&mut raw)
                .context("Failed to read stdin")?;
            Ok(raw)
        }
    }
}

fn to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("Failed to serialize output")
}
