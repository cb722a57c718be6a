use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use crate::app::models::AppId;
use crate::app::ports::AppServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn remove_app(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(app_id): Path<String>,
) -> Result<ApiSuccess<()>, ApiError> {
    state
        .app_service
        .remove_app(&AppId::new(app_id), &user.user_id)
        .await
        .map_err(ApiError::from)
        .map(|_| ApiSuccess::new(StatusCode::NO_CONTENT, ()))
}
