use anyhow::Context;
use clap::Parser;
use std::{path::PathBuf, sync::Arc};
use tracing::{info, warn};

use weather_core::{
    CacheStore, Config, HistoryStore, JsonFileHistory, MemoryCache, MemoryHistory, WeatherResult,
    WeatherService, provider::provider_from_config,
};

use crate::{routes, state::AppState};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather-server", version, about = "Weather lookup HTTP service")]
pub struct Cli {
    /// Config file path. Defaults to `config.toml` in the platform config directory.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Listen address, e.g. "0.0.0.0:8000". Overrides `[server] bind`.
    #[arg(long)]
    pub bind: Option<String>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let bind = self.bind.unwrap_or_else(|| config.server.bind.clone());

        let service = build_service(&config).await?;
        let app = routes::create_router(AppState::new(service));

        let listener = tokio::net::TcpListener::bind(&bind)
            .await
            .with_context(|| format!("Failed to bind {bind}"))?;
        info!("Listening on {}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("Server error")?;

        info!("Server stopped");
        Ok(())
    }
}

async fn build_service(config: &Config) -> anyhow::Result<WeatherService> {
    let provider = provider_from_config(&config.provider, config.api_key());
    if let Err(e) = &provider {
        warn!(error = %e, "Weather provider not configured; uncached lookups will fail with 503");
    }

    let history: Arc<dyn HistoryStore> = match &config.history.path {
        Some(path) => Arc::new(
            JsonFileHistory::open(path)
                .await
                .with_context(|| format!("Failed to open history file: {}", path.display()))?,
        ),
        None => {
            info!("No history path configured, keeping history in memory");
            Arc::new(MemoryHistory::new())
        }
    };

    let cache: Arc<dyn CacheStore<WeatherResult>> = Arc::new(MemoryCache::new());

    Ok(WeatherService::new(provider, cache, history))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
