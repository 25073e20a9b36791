#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod commands;
mod config;

use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::{Cli, Command};

/// Tracing target for CLI lifecycle events.
pub const TRACING_TARGET: &str = "warraq_cli";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET,
            error = %error,
            "command terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing()?;

    match cli.command {
        Command::Ingest { ref file, ref name } => {
            commands::ingest(&cli.services, file, name.as_deref()).await
        }
        Command::Ask {
            ref question,
            doc_language,
            multi_hop,
            no_rerank,
            no_keywords,
        } => {
            commands::ask(
                &cli.services,
                question,
                doc_language.into(),
                multi_hop,
                !no_rerank,
                !no_keywords,
            )
            .await
        }
        Command::Sweep {
            document_id,
            aggressive,
        } => commands::sweep(&cli.services, document_id, aggressive).await,
        Command::Documents { ref action } => commands::documents(&cli.services, action).await,
    }
}

/// Initializes the tracing subscriber for structured logging.
///
/// The log level is configured via `RUST_LOG`; defaults to `info`.
fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;

    Ok(())
}
