//! CLI entry point for the Hansard ingestion tool.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use hansard_core::config::FileConfig;
use hansard_core::pipeline::{self, render_human, render_json};
use hansard_core::Settings;
use tracing::{debug, error, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let file_config = FileConfig::discover(args.config.as_deref())?;

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config log_level > info
    let default_level = if args.quiet {
        "error".to_string()
    } else {
        match args.verbose {
            0 => file_config
                .as_ref()
                .and_then(|c| c.log_level.clone())
                .unwrap_or_else(|| "info".to_string()),
            1 => "debug".to_string(),
            _ => "trace".to_string(),
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let settings = Settings::resolve(file_config.as_ref(), &args.overrides())
        .context("invalid configuration")?;
    info!(
        database = %settings.database_path.display(),
        data_dir = %settings.data_dir.display(),
        dry_run = settings.dry_run,
        "Hansard ingestion starting"
    );

    let stats = pipeline::run(&settings).await.context("ingestion aborted")?;

    if args.json {
        println!("{}", render_json(&stats)?);
    } else if !args.quiet {
        print!("{}", render_human(&stats, settings.dry_run));
    }

    let code = stats.outcome().exit_code();
    Ok(ExitCode::from(u8::try_from(code).unwrap_or(1)))
}
