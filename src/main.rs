use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod oci;
mod registry;
mod settings;
mod sync;
mod transfer;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Mirror every image listed in a file into the target registry group
    Sync {
        /// Image list (one reference per line, '#' starts a comment)
        #[arg(default_value = "images.txt")]
        file: PathBuf,
        /// Resolve and log destinations without creating repositories or copying
        #[arg(long)]
        dry_run: bool,
        /// Exit with an error if any image failed to sync
        #[arg(long)]
        fail_on_error: bool,
    },
    /// Show the repository and destination for image references
    #[command(visible_alias = "r")]
    Resolve {
        /// Source image references (e.g., mysql:5.7, ghcr.io/tonc/qinglong)
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Check configuration from the environment
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for all commands
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Sync {
            file,
            dry_run,
            fail_on_error,
        } => cli::sync::handle_sync(file, *dry_run, *fail_on_error).await,
        Commands::Resolve { references } => cli::resolve::handle_resolve(references),
        Commands::CheckConfig => cli::resolve::handle_check_config(None),
    }
}
