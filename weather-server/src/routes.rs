use axum::{Router, routing::get};
use std::sync::Arc;

use super::handlers::{get_history, get_weather, health_check};
use crate::state::AppState;

pub fn create_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/weather", get(get_weather))
        .route("/history", get(get_history))
        .with_state(app_state)
}
