use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::app::errors::AppError;
use crate::app::models::App;
use crate::app::models::AppName;
use crate::app::models::CallbackUrl;
use crate::app::models::CreateAppCommand;
use crate::app::ports::AppServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::user::models::UserId;

pub async fn create_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<CreateAppRequest>, JsonRejection>,
) -> Result<ApiSuccess<OwnedAppData>, ApiError> {
    let Json(body) = payload?;

    state
        .app_service
        .create_app(body.try_into_command(user.user_id)?)
        .await
        .map_err(ApiError::from)
        .map(|ref app| ApiSuccess::new(StatusCode::CREATED, app.into()))
}

/// HTTP request body for registering an app (raw JSON)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CreateAppRequest {
    name: String,
    callback: String,
}

impl CreateAppRequest {
    fn try_into_command(self, owner: UserId) -> Result<CreateAppCommand, AppError> {
        let name = AppName::new(self.name)?;
        let callback = CallbackUrl::new(self.callback)?;
        Ok(CreateAppCommand::new(name, callback, owner))
    }
}

/// App as seen by its owner, secret included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedAppData {
    pub app_id: String,
    pub name: String,
    pub callback: String,
    pub secret: String,
    pub created_at: DateTime<Utc>,
}

impl From<&App> for OwnedAppData {
    fn from(app: &App) -> Self {
        Self {
            app_id: app.id.to_string(),
            name: app.name.as_str().to_string(),
            callback: app.callback.as_str().to_string(),
            secret: app.secret.clone(),
            created_at: app.created_at,
        }
    }
}
