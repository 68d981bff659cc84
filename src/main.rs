use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use heimdall::lifecycle::cancel_on_signal;
use heimdall::middleware::{default_registry, register_defaults};
use heimdall::observability::init_logging;
use heimdall::Gateway;

#[derive(Parser, Debug)]
#[command(name = "heimdall", version, about = "Config-driven HTTP API gateway")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    tracing::info!(config = %cli.config.display(), "heimdall v0.1.0 starting");

    register_defaults(&default_registry());

    let gateway = Gateway::from_file(&cli.config).inspect_err(|e| {
        tracing::error!(error = %e, "Failed to initialize gateway");
    })?;

    tracing::info!(
        port = gateway.config().gateway.port,
        routes = gateway.router().len(),
        "Configuration loaded"
    );

    let lifecycle = CancellationToken::new();
    tokio::spawn(cancel_on_signal(lifecycle.clone()));

    gateway.start(lifecycle).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
