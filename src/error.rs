//! # Error Handling
//!
//! One application-wide error enum, converted into HTTP responses by the
//! `IntoResponse` impl below. Library errors are logged in full on the
//! server and flattened to generic client messages; the hand-built variants
//! carry messages that are safe to show.
//!
//! The login-related variants are deliberately vague: `InvalidCredentials`
//! answers identically for an unknown email and a wrong password so the API
//! cannot be used to enumerate accounts.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-wide error type.
///
/// The `#[from]` variants let `?` lift library errors directly; everything
/// else is constructed at the point where the condition is detected.
#[derive(Error, Debug)]
pub enum AppError {
    /// Database errors (500, detail logged server-side only)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Ceremony verification failures from the WebAuthn library.
    /// Invalid signature, origin mismatch, malformed attestation and so on
    /// all collapse into one generic 400 for the client.
    #[error("WebAuthn error: {0}")]
    WebAuthn(#[from] webauthn_rs::prelude::WebauthnError),

    /// JSON serialization errors for server-held state (500)
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Malformed, tampered or expired JWTs (401)
    #[error("Token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    /// Resource not found (404): user, credential or challenge
    #[error("Not found: {0}")]
    NotFound(String),

    /// Challenge exists but its 5-minute window has passed (401)
    #[error("Challenge expired")]
    ChallengeExpired,

    /// Signature counter did not advance: the assertion may come from a
    /// cloned authenticator (401)
    #[error("Credential counter regression detected")]
    PossibleCloning,

    /// Credential id already registered, by any user (409)
    #[error("Credential already registered")]
    DuplicateCredential,

    /// Password login failed; identical for every cause (401)
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Not authenticated or challenge/credential mismatch (401)
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed, e.g. disabled account (403)
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// State conflict, e.g. email already registered (409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors (500)
    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each variant to (status code, client-facing message). Library
        // errors get logged here with full detail and answered generically.
        let (status, error_message) = match &self {
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::WebAuthn(e) => {
                tracing::warn!("WebAuthn verification failed: {:?}", e);
                (StatusCode::BAD_REQUEST, "Verification failed".to_string())
            }
            AppError::Serialization(e) => {
                tracing::error!("Serialization error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Serialization error".to_string())
            }
            AppError::Token(e) => {
                tracing::debug!("Token rejected: {:?}", e);
                (StatusCode::UNAUTHORIZED, "Invalid or expired token".to_string())
            }
            AppError::PossibleCloning => {
                // Worth a loud log line: this is the cloned-authenticator signal.
                tracing::warn!("Signature counter regression; rejecting assertion");
                (StatusCode::UNAUTHORIZED, self.to_string())
            }
            AppError::ChallengeExpired => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::DuplicateCredential => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidCredentials => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Convenience alias; handlers and db functions all return this.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    fn status_of(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn auth_taxonomy_maps_to_expected_statuses() {
        assert_eq!(status_of(AppError::ChallengeExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::PossibleCloning), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::InvalidCredentials), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::DuplicateCredential), StatusCode::CONFLICT);
        assert_eq!(
            status_of(AppError::NotFound("x".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(AppError::Forbidden("x".into())),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn invalid_credentials_message_names_no_cause() {
        let msg = AppError::InvalidCredentials.to_string();
        assert_eq!(msg, "Invalid email or password");
    }
}
