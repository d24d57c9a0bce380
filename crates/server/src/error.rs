use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson, Response},
};
use services::services::{document_store::DocumentStoreError, loading_optimizer::LoadingError};
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Optimize(LoadingError),
    #[error(transparent)]
    Regenerate(LoadingError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Documents(#[from] DocumentStoreError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// Status and envelope for a failed optimize or regenerate call.
fn loading_failure(err: &LoadingError, failure: &str) -> (StatusCode, ApiResponse<()>) {
    match err {
        LoadingError::Configuration(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::error("API configuration error"),
        ),
        LoadingError::Validation(msg) => (StatusCode::BAD_REQUEST, ApiResponse::error(msg.clone())),
        LoadingError::OrderNotFound => (StatusCode::NOT_FOUND, ApiResponse::error("Order not found")),
        LoadingError::Upstream(_)
        | LoadingError::Sanitization(_)
        | LoadingError::Schema(_)
        | LoadingError::Database(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ApiResponse::error_with_message(failure, err.to_string()),
        ),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Optimize(err) => loading_failure(err, "Failed to optimize loading"),
            ApiError::Regenerate(err) => loading_failure(err, "Failed to regenerate instructions"),
            ApiError::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::error_with_message("Database error", err.to_string()),
            ),
            ApiError::Documents(err) => match err {
                DocumentStoreError::NotPdf | DocumentStoreError::InvalidKey(_) => {
                    (StatusCode::BAD_REQUEST, ApiResponse::error(err.to_string()))
                }
                DocumentStoreError::NotFound(_) => {
                    (StatusCode::NOT_FOUND, ApiResponse::error("Document not found"))
                }
                DocumentStoreError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiResponse::error_with_message("Document storage error", err.to_string()),
                ),
            },
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiResponse::error(msg.clone())),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiResponse::error(msg.clone())),
        };

        if status.is_server_error() {
            tracing::error!(status = %status, error = %self, "Request failed");
        } else {
            tracing::debug!(status = %status, error = %self, "Request rejected");
        }

        (status, ResponseJson(body)).into_response()
    }
}
