use anyhow::Result;
use clap::Parser;

use sqlite_peek::config::Cli;
use sqlite_peek::server;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the MCP stdio transport, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("sqlite_peek=info,rmcp=info")
            }),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let config = Cli::parse().into_config()?;

    tracing::info!(
        "Starting sqlite-peek MCP server (database: {}, read-only: {})",
        config.path.display(),
        config.read_only
    );

    // Run the server
    server::run(config).await
}
