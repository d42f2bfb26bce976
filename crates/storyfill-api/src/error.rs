//! Storyfill API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use storyfill_core::error::DomainError;
use thiserror::Error;
use tracing::error;

/// Startup and runtime errors for the API server.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Startup work against the game engine failed.
    #[error("startup error: {0}")]
    Startup(#[from] DomainError),

    /// Network binding or I/O error.
    #[error("server error: {0}")]
    Server(#[from] std::io::Error),
}

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `DomainError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self.0 {
            DomainError::Rejected(rejection) => {
                (StatusCode::CONFLICT, "rejected", rejection.notice())
            }
            DomainError::SessionNotFound(_) => {
                (StatusCode::NOT_FOUND, "session_not_found", self.0.to_string())
            }
            DomainError::SessionExists(_) => {
                (StatusCode::CONFLICT, "session_exists", self.0.to_string())
            }
            DomainError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "validation_error", self.0.to_string())
            }
            DomainError::Infrastructure(detail) => {
                error!(detail = %detail, "request failed on infrastructure error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "infrastructure_error",
                    "internal error, please retry".to_owned(),
                )
            }
        };

        let body = ErrorBody {
            error: error_code,
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use storyfill_core::error::Rejection;

    fn status_of(err: DomainError) -> StatusCode {
        let response = ApiError(err).into_response();
        response.status()
    }

    async fn body_of(err: DomainError) -> serde_json::Value {
        let response = ApiError(err).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_rejected_maps_to_409() {
        assert_eq!(
            status_of(DomainError::Rejected(Rejection::LobbyFull)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_session_not_found_maps_to_404() {
        assert_eq!(
            status_of(DomainError::SessionNotFound(-1)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_session_exists_maps_to_409() {
        assert_eq!(
            status_of(DomainError::SessionExists(-1)),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(DomainError::Validation("bad input".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_infrastructure_maps_to_500() {
        assert_eq!(
            status_of(DomainError::Infrastructure("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn test_rejected_body_carries_player_notice() {
        let json = body_of(DomainError::Rejected(Rejection::AlreadyJoined)).await;

        assert_eq!(json["error"], "rejected");
        assert_eq!(json["message"], Rejection::AlreadyJoined.notice());
    }

    #[tokio::test]
    async fn test_infrastructure_body_hides_details() {
        let json = body_of(DomainError::Infrastructure("password=hunter2".into())).await;

        assert_eq!(json["error"], "infrastructure_error");
        assert!(!json["message"].as_str().unwrap().contains("hunter2"));
    }
}
