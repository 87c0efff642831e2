// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! The `gantry` binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod download;

/// Exit code for unrecoverable errors.
const EXIT_RUNTIME_ERROR: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "gantry", version, about = "Companion CLI for the Gantry engine client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging.
    #[arg(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Download the engine CLI into the user cache for this OS/arch.
    DownloadCli,

    /// Download the buildx plugin (reserved).
    DownloadBuildx,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("error: {err:#}");
        std::process::exit(EXIT_RUNTIME_ERROR);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::DownloadCli => {
            let path = download::ensure_engine_cli().await?;
            println!("{}", path.display());
            Ok(())
        }
        Commands::DownloadBuildx => {
            anyhow::bail!("downloading the buildx binary isn't supported yet")
        }
    }
}
