use anyhow::Result;
use clap::Parser;
use fintrack_notify::cli::{Cli, CliHandler};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing for logging; RUST_LOG overrides the default level
    let default_level = if cli.debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let handler = CliHandler::new(cli.config)?;
    handler.handle_command(cli.command).await?;

    Ok(())
}
