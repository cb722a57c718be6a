use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::app::models::App;
use crate::app::models::AppId;
use crate::app::ports::AppServicePort;
use crate::inbound::http::router::AppState;

/// Public app info shown on the login page. The secret is never exposed here.
pub async fn get_app(
    State(state): State<AppState>,
    Query(query): Query<GetAppQuery>,
) -> Result<ApiSuccess<PublicAppData>, ApiError> {
    state
        .app_service
        .get_app(&AppId::new(query.app_id))
        .await
        .map_err(ApiError::from)
        .map(|ref app| ApiSuccess::new(StatusCode::OK, app.into()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetAppQuery {
    app_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublicAppData {
    pub app_id: String,
    pub name: String,
    pub callback: String,
}

impl From<&App> for PublicAppData {
    fn from(app: &App) -> Self {
        Self {
            app_id: app.id.to_string(),
            name: app.name.as_str().to_string(),
            callback: app.callback.as_str().to_string(),
        }
    }
}
