use crate::{
    config::ProviderConfig,
    error::{ConfigError, ProviderError},
    provider::openweather::OpenWeatherProvider,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};

pub mod openweather;

/// Successful outcomes of a provider call.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    /// Raw provider payload; field extraction happens in the service.
    Found(serde_json::Value),
    /// The provider does not know the city.
    NotFound,
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    async fn lookup(&self, city: &str) -> Result<Lookup, ProviderError>;
}

/// Construct the provider from config, failing if no credential is available.
pub fn provider_from_config(
    config: &ProviderConfig,
    api_key: Option<String>,
) -> Result<Arc<dyn WeatherProvider>, ConfigError> {
    let provider = OpenWeatherProvider::new(api_key, config)?;
    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_config_errors_when_missing_api_key() {
        let cfg = ProviderConfig::default();
        let err = provider_from_config(&cfg, None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingApiKey));
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn provider_from_config_works_with_key() {
        let cfg = ProviderConfig::default();
        let provider = provider_from_config(&cfg, Some("KEY".to_string()));
        assert!(provider.is_ok());
    }
}
