use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cartpilot_core_types::OrderError;
use serde_json::json;
use tracing::error;

use crate::catalog::CatalogError;

/// Error body returned by every endpoint
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl HttpError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_argument", message)
    }
}

impl From<OrderError> for HttpError {
    fn from(err: OrderError) -> Self {
        match &err {
            OrderError::Concurrency(_) => Self::new(StatusCode::CONFLICT, "in_progress", err.to_string()),
            OrderError::NotWaiting { .. } => Self::new(StatusCode::BAD_REQUEST, "not_waiting", err.to_string()),
            _ if err.is_rejection() => Self::bad_request(err.to_string()),
            _ => {
                error!(%err, "order request failed");
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal", err.to_string())
            }
        }
    }
}

impl From<CatalogError> for HttpError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::NotFound(_) => Self::new(StatusCode::BAD_REQUEST, "not_found", err.to_string()),
            CatalogError::Missing | CatalogError::InvalidUrl { .. } => Self::bad_request(err.to_string()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "code": self.code,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}
