use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Errors returned by the authentication core.
///
/// `Internal` and `Timeout` render a generic message; the wrapped source is
/// only reachable through `std::error::Error::source` for the caller's logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),

    #[error("user already exists")]
    AlreadyExists,

    #[error("user not found")]
    NotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("token expired")]
    TokenExpired,

    #[error("invalid token")]
    TokenInvalid,

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{0} timed out")]
    Timeout(&'static str),

    #[error("internal error")]
    Internal(#[source] anyhow::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AuthError::Validation(msg.into())
    }

    pub fn internal(err: impl Into<anyhow::Error>) -> Self {
        AuthError::Internal(err.into())
    }

    /// True for failures the client did not cause.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            AuthError::Internal(_) | AuthError::Timeout(_) | AuthError::Config(_)
        )
    }

    fn code(&self) -> u16 {
        match self {
            AuthError::Validation(_) => 1,
            AuthError::AlreadyExists => 2,
            // unknown email and wrong password must look the same to clients
            AuthError::NotFound | AuthError::InvalidCredentials => 3,
            AuthError::TokenExpired | AuthError::TokenInvalid => 4,
            AuthError::Config(_) | AuthError::Timeout(_) | AuthError::Internal(_) => 5,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::AlreadyExists => StatusCode::CONFLICT,
            AuthError::NotFound
            | AuthError::InvalidCredentials
            | AuthError::TokenExpired
            | AuthError::TokenInvalid => StatusCode::UNAUTHORIZED,
            AuthError::Config(_) | AuthError::Timeout(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn public_message(&self) -> String {
        match self {
            AuthError::Validation(msg) => msg.clone(),
            AuthError::AlreadyExists => "user already exists".into(),
            AuthError::NotFound | AuthError::InvalidCredentials => {
                "invalid email or password".into()
            }
            AuthError::TokenExpired | AuthError::TokenInvalid => {
                "invalid or expired token".into()
            }
            AuthError::Config(_) | AuthError::Timeout(_) | AuthError::Internal(_) => {
                "internal server error".into()
            }
        }
    }
}

/// Error body returned by every endpoint.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error_code: u16,
    pub error_message: String,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error_code: self.code(),
            error_message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_and_invalid_credentials_render_identically() {
        let a = AuthError::NotFound;
        let b = AuthError::InvalidCredentials;
        assert_eq!(a.status(), b.status());
        assert_eq!(a.code(), b.code());
        assert_eq!(a.public_message(), b.public_message());
    }

    #[test]
    fn internal_message_hides_source() {
        let err = AuthError::internal(anyhow::anyhow!("password_hash column missing"));
        assert_eq!(err.to_string(), "internal error");
        assert_eq!(err.public_message(), "internal server error");
        assert!(err.is_internal());
        let source = std::error::Error::source(&err).expect("source kept for logs");
        assert!(source.to_string().contains("password_hash"));
    }

    #[test]
    fn timeout_is_internal() {
        let err = AuthError::Timeout("user store");
        assert!(err.is_internal());
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "user store timed out");
    }

    #[test]
    fn client_errors_are_not_internal() {
        assert!(!AuthError::AlreadyExists.is_internal());
        assert!(!AuthError::TokenExpired.is_internal());
        assert_eq!(AuthError::AlreadyExists.status(), StatusCode::CONFLICT);
        assert_eq!(
            AuthError::validation("bad email").status(),
            StatusCode::BAD_REQUEST
        );
    }
}
