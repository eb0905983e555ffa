//! Weather lookup and history read paths, independent of the HTTP layer.

use std::{sync::Arc, time::Duration};

use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::{
    cache::CacheStore,
    error::{ConfigError, LookupError},
    history::HistoryStore,
    model::{HistoryRecord, NewHistoryRecord, WeatherResult, cache_key, normalize_city},
    provider::{Lookup, WeatherProvider},
};

/// How long a successful lookup is served from cache.
pub const CACHE_TTL: Duration = Duration::from_secs(600);

/// Maximum number of history records kept at any time.
pub const HISTORY_LIMIT: usize = 10;

pub struct WeatherService {
    /// `Err` when no credential was available; reported on the first cache miss.
    provider: Result<Arc<dyn WeatherProvider>, ConfigError>,
    cache: Arc<dyn CacheStore<WeatherResult>>,
    history: Arc<dyn HistoryStore>,
}

impl WeatherService {
    /// A provider `Err` still yields a working service: cached results are
    /// served and cache misses fail with [`LookupError::Config`].
    pub fn new(
        provider: Result<Arc<dyn WeatherProvider>, ConfigError>,
        cache: Arc<dyn CacheStore<WeatherResult>>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        Self {
            provider,
            cache,
            history,
        }
    }

    pub fn is_provider_configured(&self) -> bool {
        self.provider.is_ok()
    }

    /// Current weather for `city`, from cache when fresh.
    ///
    /// Only provider-backed results are written to history; cache hits are not.
    pub async fn lookup(&self, city: Option<&str>) -> Result<WeatherResult, LookupError> {
        let normalized = city
            .and_then(normalize_city)
            .ok_or(LookupError::MissingParameter)?;

        let span = info_span!("weather_lookup", city = %normalized);
        self.lookup_normalized(normalized).instrument(span).await
    }

    async fn lookup_normalized(&self, city: String) -> Result<WeatherResult, LookupError> {
        let key = cache_key(&city);

        if let Some(cached) = self.cache.get(&key).await {
            debug!("Serving weather from cache");
            return Ok(cached);
        }

        let provider = self.provider.as_ref().map_err(|e| {
            error!(error = %e, "Weather provider unavailable");
            LookupError::Config(e.clone())
        })?;

        info!("Cache miss, querying weather provider");
        let payload = match provider.lookup(&city).await {
            Ok(Lookup::Found(payload)) => payload,
            Ok(Lookup::NotFound) => {
                warn!("City not found by provider");
                return Err(LookupError::NotFound(city));
            }
            Err(e) => {
                error!(error = %e, "Weather provider call failed");
                return Err(e.into());
            }
        };

        let result = WeatherResult::from_provider_payload(&payload)
            .inspect_err(|e| error!(error = %e, "Provider payload failed validation"))?;

        self.cache.set(key, result.clone(), CACHE_TTL).await;

        self.record(&result)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to update lookup history"))?;

        Ok(result)
    }

    async fn record(&self, result: &WeatherResult) -> Result<(), LookupError> {
        let record = NewHistoryRecord::from(result.clone());
        let (id, trimmed) = self.history.append_and_trim(record, HISTORY_LIMIT).await?;
        info!(id, trimmed, "Recorded lookup in history");
        Ok(())
    }

    /// The most recent lookups, newest first.
    pub async fn history(&self) -> Result<Vec<HistoryRecord>, LookupError> {
        Ok(self.history.list_recent(HISTORY_LIMIT).await?)
    }
}
