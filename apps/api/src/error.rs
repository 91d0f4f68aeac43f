use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use postroom_core::AppError;
use serde::Serialize;
use tracing::{debug, error, warn};

/// API error payload.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    message: String,
}

/// HTTP API error wrapper around core application errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(value: AppError) -> Self {
        Self(value)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Internal failures are logged in full here and answered with an
        // opaque message; raw store or transport errors never reach clients.
        let (status, message) = match &self.0 {
            AppError::Validation(_) => {
                debug!(detail = %self.0, "request rejected");
                (StatusCode::BAD_REQUEST, self.0.to_string())
            }
            AppError::RateLimited(_) => {
                warn!(detail = %self.0, "request rate limited");
                (StatusCode::TOO_MANY_REQUESTS, self.0.to_string())
            }
            AppError::Internal(detail) => {
                error!(detail = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal error".to_owned(),
                )
            }
        };

        let payload = Json(ErrorResponse { message });

        (status, payload).into_response()
    }
}

/// Standard API result type.
pub type ApiResult<T> = Result<T, ApiError>;
