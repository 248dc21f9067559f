//! HTTP mapping for the store error taxonomy

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::error::StoreError;

/// JSON body sent with every error response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    pub code: &'static str,
    pub retryable: bool,
}

/// Wrapper turning a `StoreError` into an HTTP response.
///
/// Caller errors map to 4xx with `retryable: false`; transient failures
/// map to 503 (lock contention) or 500 (I/O) with `retryable: true` and
/// are logged server-side.
pub struct ApiError(pub StoreError);

/// Handler result alias used by all route modules
pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            StoreError::NotFound(_) => StatusCode::NOT_FOUND,
            StoreError::DuplicateFilename(_) => StatusCode::CONFLICT,
            StoreError::ValidationFailed(_) => StatusCode::BAD_REQUEST,
            StoreError::LockTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::Io(_) | StoreError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {}", self.0);
        } else {
            log::debug!("Request rejected: {}", self.0);
        }

        let body = ErrorBody {
            error: self.0.to_string(),
            code: self.0.code(),
            retryable: self.0.is_retryable(),
        };
        (status, Json(body)).into_response()
    }
}
