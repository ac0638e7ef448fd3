/// Unified error types for the Talentgate portal
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the portal
#[derive(Error, Debug)]
pub enum PortalError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Authorization errors
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., concurrent write lost a precondition)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JWT errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// Unknown email or wrong password; never distinguished to the caller
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// First-time seeker login without a valid unused access code
    #[error("A valid access code is required for first login")]
    AccessCodeRequired,

    /// Returning seeker whose linked access code has expired
    #[error("Access has been revoked")]
    AccessRevoked,

    /// Bounded code-generation retry loop exhausted without a unique code
    #[error("Could not generate a unique access code")]
    CodeGenerationExhausted,

    /// Applicant already applied to this job
    #[error("You have already applied to this job")]
    DuplicateApplication,

    /// Applicant has no resume on file
    #[error("A resume is required before applying")]
    ResumeRequired,
}

/// Error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert PortalError to HTTP response
impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            // The three login failures are internally distinct (for logging)
            // but collapse to a generic message so callers cannot enumerate
            // accounts or probe code state.
            PortalError::InvalidCredentials | PortalError::AccessRevoked => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationFailed",
                "Invalid credentials or access not permitted".to_string(),
            ),
            PortalError::AccessCodeRequired => (
                StatusCode::BAD_REQUEST,
                "AuthenticationFailed",
                "Invalid credentials or access not permitted".to_string(),
            ),
            PortalError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            PortalError::Authorization(_) => (
                StatusCode::FORBIDDEN,
                "Forbidden",
                self.to_string(),
            ),
            PortalError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            PortalError::DuplicateApplication | PortalError::ResumeRequired => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            PortalError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "NotFound",
                self.to_string(),
            ),
            PortalError::Conflict(_) => (
                StatusCode::CONFLICT,
                "Conflict",
                self.to_string(),
            ),
            PortalError::CodeGenerationExhausted => (
                StatusCode::SERVICE_UNAVAILABLE,
                "CodeGenerationExhausted",
                self.to_string(),
            ),
            PortalError::Database(_) | PortalError::Internal(_) | PortalError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
            PortalError::Jwt(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                "Invalid or expired token".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for portal operations
pub type PortalResult<T> = Result<T, PortalError>;
