use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::create_app::OwnedAppData;
use super::ApiError;
use super::ApiSuccess;
use crate::app::ports::AppServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn list_apps(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<ApiSuccess<Vec<OwnedAppData>>, ApiError> {
    state
        .app_service
        .list_apps(&user.user_id)
        .await
        .map_err(ApiError::from)
        .map(|apps| {
            ApiSuccess::new(
                StatusCode::OK,
                apps.iter().map(OwnedAppData::from).collect(),
            )
        })
}
