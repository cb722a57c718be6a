use auth::JwtError;
use thiserror::Error;

use crate::app::errors::AppError;
use crate::user::errors::UserError;

/// Failures of code issuance, token exchange and access verification.
#[derive(Debug, Clone, Error)]
pub enum TokenError {
    /// Bad username or password. Unknown users fail the same way.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Authorization code not found")]
    CodeNotFound,

    #[error("Authorization code expired")]
    AuthCodeExpired,

    /// Malformed, forged, revoked or already rotated token.
    #[error("Token is invalid")]
    TokenInvalid,

    #[error("Token expired")]
    TokenExpired,

    #[error("App is invalid")]
    AppInvalid,

    #[error("Authentication required")]
    AuthRequired,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TokenError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            TokenError::InvalidCredentials => "invalid_credentials",
            TokenError::CodeNotFound => "code_not_found",
            TokenError::AuthCodeExpired => "auth_code_expired",
            TokenError::TokenInvalid => "token_invalid",
            TokenError::TokenExpired => "token_expired",
            TokenError::AppInvalid => "app_invalid",
            TokenError::AuthRequired => "auth_required",
            TokenError::DatabaseError(_) | TokenError::Internal(_) => "internal_error",
        }
    }
}

impl From<JwtError> for TokenError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::TokenExpired => TokenError::TokenExpired,
            JwtError::InvalidToken(_) | JwtError::UnexpectedKind { .. } => TokenError::TokenInvalid,
            JwtError::EncodingFailed(msg) => TokenError::Internal(msg),
        }
    }
}

impl From<UserError> for TokenError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::DatabaseError(msg) => TokenError::DatabaseError(msg),
            UserError::InvalidCredentials
            | UserError::InvalidUsername(_)
            | UserError::EmptyPassword => TokenError::InvalidCredentials,
            other => TokenError::Internal(other.to_string()),
        }
    }
}

impl From<AppError> for TokenError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::NotFound(_) => TokenError::AppInvalid,
            AppError::DatabaseError(msg) => TokenError::DatabaseError(msg),
            other => TokenError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_and_invalid_stay_distinct() {
        assert_eq!(
            TokenError::from(JwtError::TokenExpired).code(),
            "token_expired"
        );
        assert_eq!(
            TokenError::from(JwtError::InvalidToken("bad signature".to_string())).code(),
            "token_invalid"
        );
    }

    #[test]
    fn test_store_failures_are_opaque() {
        let err = TokenError::from(UserError::DatabaseError("relation missing".to_string()));
        assert_eq!(err.code(), "internal_error");
    }
}
