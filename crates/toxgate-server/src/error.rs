//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use toxgate_core::classifier::ClassifierError;

/// API errors.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body carried no usable message.
    #[error("No 'message' field provided")]
    MissingMessage,

    /// The classifier failed to initialize at startup.
    #[error("NLP model not loaded")]
    ModelNotLoaded,

    /// Inference failed for this request.
    #[error("{0}")]
    Inference(String),
}

impl From<ClassifierError> for ApiError {
    fn from(e: ClassifierError) -> Self {
        match e {
            ClassifierError::Unavailable => ApiError::ModelNotLoaded,
            ClassifierError::Inference(message) => ApiError::Inference(message),
        }
    }
}

/// Error body for client and availability errors.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Error body for failed inference calls.
#[derive(Debug, Serialize)]
struct FailureBody {
    success: bool,
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::MissingMessage => (
                StatusCode::BAD_REQUEST,
                axum::Json(ErrorBody {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            ApiError::ModelNotLoaded => (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(ErrorBody {
                    error: self.to_string(),
                }),
            )
                .into_response(),
            ApiError::Inference(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(FailureBody {
                    success: false,
                    error: self.to_string(),
                }),
            )
                .into_response(),
        }
    }
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;
