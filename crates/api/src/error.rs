//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use orders::OrderServiceError;
use serde_json::json;
use thiserror::Error;

/// API-level error type that maps to HTTP responses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The caller could not be identified.
    #[error("{0}")]
    Unauthorized(String),

    /// The caller lacks the required role.
    #[error("{0}")]
    Forbidden(String),

    /// Bad request from the client.
    #[error("{0}")]
    BadRequest(String),

    /// Error raised by the order service.
    #[error(transparent)]
    Service(#[from] OrderServiceError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            ApiError::Service(err) => service_error_to_response(err),
        };

        (status, axum::Json(body)).into_response()
    }
}

fn service_error_to_response(err: OrderServiceError) -> (StatusCode, serde_json::Value) {
    // Both stock rejections look the same to clients
    if let Some(key) = err.variant() {
        let message = format!(
            "Insufficient stock for product {} (size {}, color {})",
            key.product_id, key.size_id, key.color_id
        );
        return (
            StatusCode::CONFLICT,
            json!({
                "error": message,
                "product_id": key.product_id,
                "size_id": key.size_id,
                "color_id": key.color_id,
            }),
        );
    }

    let status = match &err {
        OrderServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        OrderServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        OrderServiceError::State(_) => StatusCode::CONFLICT,
        _ => {
            tracing::error!(error = %err, "internal server error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, json!({ "error": err.to_string() }))
}
