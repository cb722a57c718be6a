use thiserror::Error;

/// Error for AppName validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppNameError {
    #[error("App name must not be empty")]
    Empty,

    #[error("App name too long: maximum {max} characters, got {actual}")]
    TooLong { max: usize, actual: usize },
}

/// Error for CallbackUrl validation failures
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallbackUrlError {
    #[error("Malformed callback URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("Callback URL must start with http:// or https://")]
    UnsupportedScheme,

    #[error("Callback URL has no host")]
    MissingHost,

    #[error("Callback URL must not carry a fragment")]
    Fragment,
}

/// Top-level error for all app-related operations
#[derive(Debug, Clone, Error)]
pub enum AppError {
    #[error("Invalid app name: {0}")]
    InvalidName(#[from] AppNameError),

    #[error("Invalid callback URL: {0}")]
    InvalidCallback(#[from] CallbackUrlError),

    #[error("App not found: {0}")]
    NotFound(String),

    #[error("App secret signing failed: {0}")]
    Signing(#[from] auth::JwtError),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AppError {
    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidName(_) => "invalid_app_name",
            AppError::InvalidCallback(_) => "invalid_callback",
            AppError::NotFound(_) => "app_not_found",
            AppError::Signing(_) | AppError::DatabaseError(_) => "internal_error",
        }
    }
}
