use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use chrono::DateTime;
use chrono::Utc;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::token::models::AccessTokenRecord;
use crate::token::ports::TokenServicePort;

/// Active access tokens of the current user. Token strings are never returned.
pub async fn list_tokens(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<Vec<TokenData>>, ApiError> {
    state
        .token_service
        .list_tokens(&user.user_id)
        .await
        .map_err(ApiError::from)
        .map(|records| {
            ApiSuccess::new(
                StatusCode::OK,
                records.iter().map(TokenData::from).collect(),
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    pub id: String,
    pub app_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&AccessTokenRecord> for TokenData {
    fn from(record: &AccessTokenRecord) -> Self {
        Self {
            id: record.id.to_string(),
            app_id: record.app_id.as_ref().map(|id| id.to_string()),
            created_at: record.created_at,
        }
    }
}
