use axum::{
    Json,
    extract::rejection::QueryRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use weather_core::LookupError;

/// HTTP rendering of a failed request: `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    Lookup(LookupError),
    /// The query string could not be decoded into request parameters.
    BadQuery(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadQuery(_) => StatusCode::BAD_REQUEST,
            Self::Lookup(err) => match err {
                LookupError::MissingParameter => StatusCode::BAD_REQUEST,
                LookupError::NotFound(_) => StatusCode::NOT_FOUND,
                LookupError::Provider(_) | LookupError::Config(_) => {
                    StatusCode::SERVICE_UNAVAILABLE
                }
                LookupError::Validation(_) | LookupError::Store(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        Self::Lookup(err)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadQuery(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            Self::Lookup(err) => err.to_string(),
            Self::BadQuery(message) => message,
        };
        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}
