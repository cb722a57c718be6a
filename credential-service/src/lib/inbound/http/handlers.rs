use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::app::errors::AppError;
use crate::token::errors::TokenError;
use crate::user::errors::UserError;

pub mod authenticate;
pub mod authorize;
pub mod change_password;
pub mod create_app;
pub mod create_user;
pub mod current_user;
pub mod delete_user;
pub mod get_app;
pub mod info;
pub mod issue_code;
pub mod list_apps;
pub mod list_tokens;
pub mod remove_app;
pub mod revoke_tokens;
pub mod token;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

/// Error response with a stable machine-readable code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// Opaque failure: the detail is logged, never sent to the client.
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        tracing::error!(error = %detail, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error",
        )
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ApiResponseBody::new_error(
                self.status,
                self.code,
                self.message,
            )),
        )
            .into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_request",
            rejection.body_text(),
        )
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        let status = match err {
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::UsernameAlreadyExists(_) => StatusCode::CONFLICT,
            UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserError::InvalidUsername(_) | UserError::EmptyPassword => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            UserError::Password(_) | UserError::DatabaseError(_) | UserError::Unknown(_) => {
                return ApiError::internal(err);
            }
        };

        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match err {
            AppError::InvalidName(_) | AppError::InvalidCallback(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Signing(_) | AppError::DatabaseError(_) => return ApiError::internal(err),
        };

        ApiError::new(status, err.code(), err.to_string())
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        let status = match err {
            TokenError::InvalidCredentials
            | TokenError::TokenInvalid
            | TokenError::TokenExpired
            | TokenError::AuthRequired => StatusCode::UNAUTHORIZED,
            TokenError::CodeNotFound | TokenError::AuthCodeExpired | TokenError::AppInvalid => {
                StatusCode::BAD_REQUEST
            }
            TokenError::DatabaseError(_) | TokenError::Internal(_) => {
                return ApiError::internal(err)
            }
        };

        ApiError::new(status, err.code(), err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

impl ApiResponseBody<ApiErrorData> {
    pub fn new_error(status_code: StatusCode, code: &str, message: String) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data: ApiErrorData {
                code: code.to_string(),
                message,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
}
