use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::authorize::AuthorizationData;
use super::ApiError;
use super::ApiSuccess;
use crate::app::models::AppId;
use crate::app::ports::AppServicePort;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;
use crate::token::ports::TokenServicePort;

/// Authorization code for an already signed-in user.
pub async fn issue_code(
    State(state): State<AppState>,
    Extension(user): Extension<AuthenticatedUser>,
    payload: Result<Json<IssueCodeRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorizationData>, ApiError> {
    let Json(body) = payload?;
    let app_id = AppId::new(body.app_id);

    let code = state
        .token_service
        .issue_code(&user.user_id, &app_id)
        .await?;
    let app = state.app_service.get_app(&app_id).await?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        AuthorizationData {
            redirect_uri: app.callback.with_code(code.code.as_str()),
            code: code.code.to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IssueCodeRequest {
    app_id: String,
}
