//! Error taxonomy shared by the provider client, the stores and the lookup service.

/// Problems detected while building a provider from configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error(
        "No API key configured for the weather provider.\n\
         Hint: set OPENWEATHERMAP_API_KEY or `api_key` under [provider] in the config file."
    )]
    MissingApiKey,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Transport or API failure while talking to the weather provider.
///
/// A 404 from the provider is not represented here: it is a regular
/// [`crate::provider::Lookup::NotFound`] outcome.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Failed to send request to weather provider: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Weather provider request failed with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode weather provider response: {0}")]
    Decode(String),
}

/// The provider answered 2xx but the payload does not have the expected shape.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unexpected payload shape: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("payload has an empty city name")]
    EmptyCity,

    #[error("payload has no weather description")]
    MissingDescription,

    #[error("humidity {0} is outside 0..=100")]
    HumidityOutOfRange(i64),
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("History file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("History serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Terminal outcome of a failed weather lookup.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("The 'city' parameter is required.")]
    MissingParameter,

    #[error("City '{0}' not found.")]
    NotFound(String),

    #[error("Error communicating with the weather API: {0}")]
    Provider(#[from] ProviderError),

    #[error("Weather provider is not configured: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to format weather data: {0}")]
    Validation(#[from] ValidationError),

    #[error("Failed to record lookup history: {0}")]
    Store(#[from] StoreError),
}
