//! Critpath CLI binary.

use anyhow::Result;
use critpath::cli::Cli;
use tracing_subscriber::EnvFilter;

/// Main entry point for the critpath CLI.
///
/// Uses tokio's `current_thread` runtime; the orchestrator and scanner are
/// I/O-bound and cooperate on one thread.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Controlled via RUST_LOG, e.g. RUST_LOG=critpath=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("critpath=info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tracing::debug!("Starting critpath CLI");

    let cli = Cli::parse_args();
    cli.execute().await?;

    tracing::debug!("Critpath CLI completed successfully");
    Ok(())
}
