use axum::http::StatusCode;
use axum::Extension;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedUser;

pub async fn current_user(
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<CurrentUserData>, ApiError> {
    Ok(ApiSuccess::new(StatusCode::OK, (&user).into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUserData {
    pub id: String,
    pub username: String,
    /// `"self"` or the app id the presented token was issued for.
    pub audience: String,
}

impl From<&AuthenticatedUser> for CurrentUserData {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            id: user.user_id.to_string(),
            username: user.username.clone(),
            audience: user.audience.to_string(),
        }
    }
}
