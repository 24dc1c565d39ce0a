use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Structured JSON error body returned by all API error responses.
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub error: String,
    pub code: &'static str,
}

/// Unified application error type.
///
/// Implements [`IntoResponse`] so handlers can return `Result<T, AppError>`
/// and axum will convert errors into structured JSON responses with the
/// appropriate HTTP status code.
#[derive(Debug)]
pub enum AppError {
    /// Request body is missing, unparsable or not a JSON object (400).
    Validation(String),
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Validation(msg) => f.write_str(msg),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, error) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
        };
        (status, Json(ApiErrorBody { error, code })).into_response()
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Validation(format!("Invalid JSON: {e}"))
    }
}
