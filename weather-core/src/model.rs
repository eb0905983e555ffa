use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Namespace prefix for weather entries in the cache.
pub const CACHE_KEY_PREFIX: &str = "weather_";

/// Normalized weather data returned to callers and stored in history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherResult {
    pub city: String,
    pub temperature_celsius: f64,
    pub description: String,
    pub humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: i64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    weather: Vec<OwWeather>,
}

impl WeatherResult {
    /// Extract the fields we expose from a raw current-weather payload.
    ///
    /// Only the first entry of `weather` is used for the description.
    pub fn from_provider_payload(payload: &serde_json::Value) -> Result<Self, ValidationError> {
        let parsed = OwCurrentResponse::deserialize(payload)?;

        if parsed.name.trim().is_empty() {
            return Err(ValidationError::EmptyCity);
        }

        let description = parsed
            .weather
            .into_iter()
            .next()
            .map(|w| w.description)
            .ok_or(ValidationError::MissingDescription)?;

        let humidity = u8::try_from(parsed.main.humidity)
            .ok()
            .filter(|h| *h <= 100)
            .ok_or(ValidationError::HumidityOutOfRange(parsed.main.humidity))?;

        Ok(Self {
            city: parsed.name,
            temperature_celsius: parsed.main.temp,
            description,
            humidity,
        })
    }
}

/// A stored lookup. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: u64,
    /// City as reported by the provider, not the normalized lookup key.
    pub city: String,
    pub timestamp: DateTime<Utc>,
    pub data: WeatherResult,
}

/// Payload for [`crate::history::HistoryStore::append`]; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewHistoryRecord {
    pub city: String,
    pub data: WeatherResult,
}

impl From<WeatherResult> for NewHistoryRecord {
    fn from(data: WeatherResult) -> Self {
        Self {
            city: data.city.clone(),
            data,
        }
    }
}

/// Lowercase and trim a city name. Returns `None` when nothing is left.
pub fn normalize_city(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized)
    }
}

pub fn cache_key(normalized_city: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{normalized_city}")
}
