//! Binary crate for the `weather-server` HTTP service.
//!
//! This crate focuses on:
//! - Parsing CLI arguments
//! - Logging setup
//! - Exposing the lookup service over HTTP

use clap::Parser;

mod cli;
mod error;
mod handlers;
mod routes;
mod state;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,weather_core=info,weather_server=info".into()),
        )
        .with_target(true)
        .init();

    let cmd = cli::Cli::parse();
    cmd.run().await
}
