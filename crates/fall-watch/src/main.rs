//! Fall Watch - Main Entry Point

use clap::Parser;
use fall_watch::{init_logging, run, Cli};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    info!("=== Fall Watch v{} ===", env!("CARGO_PKG_VERSION"));
    run(cli).await
}
