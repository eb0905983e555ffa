//! Core library for the weather lookup service.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The OpenWeatherMap provider client
//! - Cache and history stores behind swappable traits
//! - The lookup service that ties them together
//!
//! It is used by `weather-server`, but carries no HTTP framework types of its own.

pub mod cache;
pub mod config;
pub mod error;
pub mod history;
pub mod model;
pub mod provider;
pub mod service;

pub use cache::{CacheStore, MemoryCache};
pub use config::Config;
pub use error::{ConfigError, LookupError, ProviderError, StoreError, ValidationError};
pub use history::{HistoryStore, JsonFileHistory, MemoryHistory};
pub use model::{HistoryRecord, NewHistoryRecord, WeatherResult};
pub use provider::{Lookup, WeatherProvider};
pub use service::WeatherService;
