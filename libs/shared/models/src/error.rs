use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Slot unavailable: {0}")]
    SlotUnavailable(String),

    #[error("Slot taken: {0}")]
    SlotTaken(String),

    #[error("Gone: {0}")]
    Gone(String),

    #[error("Timeout: {0}")]
    Timeout(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Conflict(_) | AppError::SlotUnavailable(_) | AppError::SlotTaken(_) => StatusCode::CONFLICT,
            AppError::Gone(_) => StatusCode::GONE,
            AppError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        }
    }

    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Auth(_) => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::BadRequest(_) => "bad_request",
            AppError::ValidationError(_) => "validation_error",
            AppError::Internal(_) => "internal_error",
            AppError::Database(_) => "database_error",
            AppError::Conflict(_) => "conflict",
            AppError::SlotUnavailable(_) => "slot_unavailable",
            AppError::SlotTaken(_) => "slot_taken",
            AppError::Gone(_) => "gone",
            AppError::Timeout(_) => "timeout",
        }
    }

    fn message(&self) -> &str {
        match self {
            AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::BadRequest(msg)
            | AppError::Internal(msg)
            | AppError::Database(msg)
            | AppError::ValidationError(msg)
            | AppError::Conflict(msg)
            | AppError::SlotUnavailable(msg)
            | AppError::SlotTaken(msg)
            | AppError::Gone(msg)
            | AppError::Timeout(msg) => msg,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!("Error: {}: {}", status, message);
        } else {
            tracing::debug!("Rejected request: {}: {}", status, message);
        }

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_errors_share_status_but_not_code() {
        let unavailable = AppError::SlotUnavailable("closed".to_string());
        let taken = AppError::SlotTaken("booked".to_string());

        assert_eq!(unavailable.status_code(), StatusCode::CONFLICT);
        assert_eq!(taken.status_code(), StatusCode::CONFLICT);
        assert_ne!(unavailable.code(), taken.code());
    }

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::ValidationError("end_date before start_date".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
