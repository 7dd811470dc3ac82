//! API error type shared by all handlers
//!
//! Maps application failures to structured JSON error responses. Handlers
//! return `Result<HttpResponse, ApiError>` and propagate with `?`; the
//! `ResponseError` impl turns each variant into the right status code with
//! an `{"error": ...}` body.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad input shape or range (non-positive price, quantity over stock, ...)
    #[error("{0}")]
    BadRequest(String),

    /// No or invalid session
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but wrong role or not the owner
    #[error("{0}")]
    Forbidden(String),

    /// Resource or cache entry missing
    #[error("{0}")]
    NotFound(String),

    /// Staged registration expired or already consumed
    #[error("{0}")]
    RegistrationExpired(String),

    /// Duplicate unique key (username, follow pair, payment reference,
    /// shed number after allocation retry)
    #[error("{0}")]
    Conflict(String),

    /// Domain shed quota (100) reached
    #[error("{0}")]
    CapacityExceeded(String),

    /// Payment gateway call failed or returned a malformed response
    #[error("payment gateway error: {0}")]
    Upstream(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// Stable machine-readable code included in the response body.
    fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "bad_request",
            Self::Unauthorized(_) => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::RegistrationExpired(_) => "registration_expired",
            Self::Conflict(_) => "conflict",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::Upstream(_) => "upstream_error",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RegistrationExpired(_) => StatusCode::GONE,
            Self::Conflict(_) | Self::CapacityExceeded(_) => StatusCode::CONFLICT,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        // Internal details are logged, never leaked to the caller.
        let message = match self {
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(serde_json::json!({
            "error": message,
            "code": self.code(),
        }))
    }
}

impl From<actix_web::error::BlockingError> for ApiError {
    fn from(e: actix_web::error::BlockingError) -> Self {
        Self::Internal(format!("blocking task failed: {e}"))
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::Internal(format!("{e:#}"))
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::BadRequest(format!("Validation error: {e}"))
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match &e {
            diesel::result::Error::NotFound => Self::NotFound("Record not found".to_string()),
            _ if is_unique_violation(&e) => Self::Conflict("Duplicate record".to_string()),
            _ => Self::Internal(format!("Database error: {e}")),
        }
    }
}

/// True when a diesel error is a UNIQUE constraint violation, which the
/// storage layer uses to reject duplicate follows, payment references and
/// racing shed allocations.
pub fn is_unique_violation(e: &diesel::result::Error) -> bool {
    matches!(
        e,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::BadRequest("x".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::RegistrationExpired("x".into()).status_code(),
            StatusCode::GONE
        );
        assert_eq!(
            ApiError::CapacityExceeded("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_unique_violation_detection() {
        let err = diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            Box::new("UNIQUE constraint failed: sheds.shed_number".to_string()),
        );
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&diesel::result::Error::NotFound));
    }
}
