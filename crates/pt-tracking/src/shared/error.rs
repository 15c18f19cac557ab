//! Platform Error Types

use thiserror::Error;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response, Json},
};
use utoipa::ToSchema;

#[derive(Error, Debug)]
pub enum TrackingError {
    #[error("{entity_type} not found: {id}")]
    NotFound { entity_type: &'static str, id: String },

    #[error("Duplicate {entity_type}: {field}={value}")]
    Duplicate { entity_type: &'static str, field: &'static str, value: String },

    #[error("Validation error: {message}")]
    Validation { message: String, details: Option<serde_json::Value> },

    #[error("Authorization error: {message}")]
    Unauthorized { message: String },

    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {message}")]
    InvalidToken { message: String },

    #[error("Too many requests")]
    RateLimited,

    #[error("Audit write failed: {message}")]
    AuditWrite { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl TrackingError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn duplicate(entity_type: &'static str, field: &'static str, value: impl Into<String>) -> Self {
        Self::Duplicate {
            entity_type,
            field,
            value: value.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation { message: message.into(), details: None }
    }

    pub fn validation_with_details(message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Validation { message: message.into(), details: Some(details) }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized { message: message.into() }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden { message: message.into() }
    }

    pub fn audit_write(message: impl Into<String>) -> Self {
        Self::AuditWrite { message: message.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }

    /// Stable machine-readable code carried in the error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            TrackingError::NotFound { .. } => "NOT_FOUND",
            TrackingError::Duplicate { .. } => "CONFLICT",
            TrackingError::Validation { .. } => "VALIDATION_ERROR",
            TrackingError::Unauthorized { .. } => "UNAUTHORIZED",
            TrackingError::Forbidden { .. } => "FORBIDDEN",
            TrackingError::InvalidCredentials => "INVALID_CREDENTIALS",
            TrackingError::TokenExpired => "TOKEN_EXPIRED",
            TrackingError::InvalidToken { .. } => "INVALID_TOKEN",
            TrackingError::RateLimited => "RATE_LIMITED",
            _ => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            TrackingError::NotFound { .. } => StatusCode::NOT_FOUND,
            TrackingError::Duplicate { .. } => StatusCode::CONFLICT,
            TrackingError::Validation { .. } => StatusCode::BAD_REQUEST,
            TrackingError::Unauthorized { .. }
            | TrackingError::InvalidCredentials
            | TrackingError::TokenExpired
            | TrackingError::InvalidToken { .. } => StatusCode::UNAUTHORIZED,
            TrackingError::Forbidden { .. } => StatusCode::FORBIDDEN,
            TrackingError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrackingError>;

/// Error envelope: `{ success: false, error: { code, message, details? } }`
#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

#[derive(Debug, serde::Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for TrackingError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 500-class failures never expose internal error text
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Internal error");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let details = match self {
            TrackingError::Validation { details, .. } => details,
            _ => None,
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_code_and_status() {
        let err = TrackingError::not_found("LossRecord", "42");
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_duplicate_maps_to_conflict() {
        let err = TrackingError::duplicate("User", "email", "a@b.com");
        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_auth_errors_are_401() {
        assert_eq!(TrackingError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(TrackingError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            TrackingError::InvalidToken { message: "bad".into() }.status(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_audit_write_is_internal() {
        let err = TrackingError::audit_write("disk full");
        assert_eq!(err.code(), "INTERNAL_ERROR");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_rate_limited_status() {
        assert_eq!(TrackingError::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
