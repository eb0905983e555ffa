use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;
use std::sync::Arc;
use weather_core::{HistoryRecord, WeatherResult};

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct WeatherParams {
    pub city: Option<String>,
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let uptime = state.start_time.elapsed();
    let response = serde_json::json!({
        "status": "ok",
        "uptime": format!("{}s", uptime.as_secs()),
        "provider_configured": state.service.is_provider_configured(),
    });
    tracing::debug!("Health check response: {:?}", response);
    Json(response)
}

/// `GET /weather?city=<name>`
///
/// Malformed query strings, including percent-escapes that are not valid
/// UTF-8, are answered with 400 and the usual JSON error body.
pub async fn get_weather(
    State(state): State<Arc<AppState>>,
    query: Result<Query<WeatherParams>, QueryRejection>,
) -> Result<Json<WeatherResult>, ApiError> {
    let Query(params) = query?;

    // Query decoding replaces invalid UTF-8 with U+FFFD instead of failing.
    let city = params.city.as_deref();
    if city.is_some_and(|c| c.contains(char::REPLACEMENT_CHARACTER)) {
        return Err(ApiError::BadQuery(
            "The 'city' parameter is not valid UTF-8.".to_string(),
        ));
    }

    let result = state.service.lookup(city).await?;
    Ok(Json(result))
}

/// `GET /history`
pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryRecord>>, ApiError> {
    let records = state.service.history().await?;
    Ok(Json(records))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{
        body::to_bytes,
        http::{StatusCode, Uri},
        response::{IntoResponse, Response},
    };
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use weather_core::{
        ConfigError, Lookup, MemoryCache, MemoryHistory, ProviderError, WeatherProvider,
        WeatherService,
    };

    /// Answers every city with a fixed payload, or reports it unknown.
    #[derive(Debug)]
    struct StaticProvider {
        payload: Option<Value>,
        fail: bool,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl WeatherProvider for StaticProvider {
        async fn lookup(&self, _city: &str) -> Result<Lookup, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ProviderError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            Ok(match &self.payload {
                Some(p) => Lookup::Found(p.clone()),
                None => Lookup::NotFound,
            })
        }
    }

    fn provider(payload: Option<Value>, fail: bool) -> Arc<StaticProvider> {
        Arc::new(StaticProvider {
            payload,
            fail,
            calls: AtomicUsize::new(0),
        })
    }

    fn state_with(provider: Arc<StaticProvider>) -> Arc<AppState> {
        let provider: Arc<dyn WeatherProvider> = provider;
        AppState::new(WeatherService::new(
            Ok(provider),
            Arc::new(MemoryCache::<WeatherResult>::new()),
            Arc::new(MemoryHistory::new()),
        ))
    }

    fn london() -> Value {
        json!({
            "name": "London",
            "main": {"temp": 15.0, "humidity": 80},
            "weather": [{"description": "clear sky"}]
        })
    }

    async fn weather(state: &Arc<AppState>, city: Option<&str>) -> Response {
        let params = WeatherParams {
            city: city.map(str::to_string),
        };
        get_weather(State(state.clone()), Ok(Query(params)))
            .await
            .into_response()
    }

    async fn weather_at(state: &Arc<AppState>, uri: &str) -> Response {
        let uri: Uri = uri.parse().unwrap();
        let query = Query::<WeatherParams>::try_from_uri(&uri);
        get_weather(State(state.clone()), query)
            .await
            .into_response()
    }

    async fn history(state: &Arc<AppState>) -> Response {
        get_history(State(state.clone())).await.into_response()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn weather_success_shapes_response_and_records_history() {
        let provider = provider(Some(london()), false);
        let state = state_with(provider.clone());

        let response = weather(&state, Some("  LONDON ")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({
                "city": "London",
                "temperature_celsius": 15.0,
                "description": "clear sky",
                "humidity": 80
            })
        );

        let response = history(&state).await;
        assert_eq!(response.status(), StatusCode::OK);
        let records = body_json(response).await;
        let records = records.as_array().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["city"], "London");
        assert_eq!(records[0]["data"]["humidity"], 80);
        assert!(records[0]["id"].is_u64());
        assert!(records[0]["timestamp"].is_string());
    }

    #[tokio::test]
    async fn repeated_lookup_is_served_from_cache() {
        let provider = provider(Some(london()), false);
        let state = state_with(provider.clone());

        for _ in 0..3 {
            assert_eq!(weather(&state, Some("London")).await.status(), StatusCode::OK);
        }

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        let records = body_json(history(&state).await).await;
        assert_eq!(records.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_city_is_400() {
        let provider = provider(Some(london()), false);
        let state = state_with(provider.clone());

        for city in [None, Some("")] {
            let response = weather(&state, city).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert!(body_json(response).await["error"].as_str().unwrap().contains("city"));
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn percent_encoded_city_is_decoded() {
        let provider = provider(Some(london()), false);
        let state = state_with(provider.clone());

        let response = weather_at(&state, "/weather?city=S%C3%A3o%20Paulo").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn malformed_query_is_400_json() {
        let provider = provider(Some(london()), false);
        let state = state_with(provider.clone());

        let uris = [
            "/weather?city=a&city=b",
            "/weather?city=%FF",
            "/weather?city=x%FFy",
        ];
        for uri in uris {
            let response = weather_at(&state, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
            let body = body_json(response).await;
            assert!(body["error"].is_string(), "{uri}: {body}");
        }
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_city_is_404() {
        let state = state_with(provider(None, false));

        let response = weather(&state, Some("Atlantis")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let records = body_json(history(&state).await).await;
        assert!(records.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn provider_failure_is_503_with_detail() {
        let state = state_with(provider(None, true));

        let response = weather(&state, Some("London")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let error = body_json(response).await["error"].as_str().unwrap().to_string();
        assert!(error.contains("boom"));

        let records = body_json(history(&state).await).await;
        assert!(records.as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_500() {
        let state = state_with(provider(Some(json!({"name": "London"})), false));

        let response = weather(&state, Some("London")).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn missing_credential_is_503() {
        let state = AppState::new(WeatherService::new(
            Err(ConfigError::MissingApiKey),
            Arc::new(MemoryCache::<WeatherResult>::new()),
            Arc::new(MemoryHistory::new()),
        ));

        let response = weather(&state, Some("London")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn empty_history_is_empty_list() {
        let state = state_with(provider(None, false));

        let response = history(&state).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!([]));
    }

    #[tokio::test]
    async fn health_reports_provider_state() {
        let state = state_with(provider(None, false));

        let Json(body) = health_check(State(state)).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider_configured"], true);
    }
}
