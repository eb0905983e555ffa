use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::{
    config::ProviderConfig,
    error::{ConfigError, ProviderError},
};

use super::{Lookup, WeatherProvider};

#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    lang: String,
    http: Client,
}

impl OpenWeatherProvider {
    /// Fails with [`ConfigError::MissingApiKey`] when the key is absent or blank.
    pub fn new(api_key: Option<String>, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            api_key,
            base_url: config.base_url.clone(),
            lang: config.lang.clone(),
            http,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn lookup(&self, city: &str) -> Result<Lookup, ProviderError> {
        let res = self
            .http
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", self.lang.as_str()),
            ])
            .send()
            .await
            .map_err(ProviderError::Transport)?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            tracing::debug!(city, "OpenWeather reported city as unknown");
            return Ok(Lookup::NotFound);
        }

        let body = res.text().await.map_err(ProviderError::Transport)?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let payload = serde_json::from_str(&body).map_err(|e| {
            ProviderError::Decode(format!("{e}; body: {}", truncate_body(&body)))
        })?;

        Ok(Lookup::Found(payload))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
