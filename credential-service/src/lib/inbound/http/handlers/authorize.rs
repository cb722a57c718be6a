use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::app::models::AppId;
use crate::app::ports::AppServicePort;
use crate::inbound::http::router::AppState;
use crate::token::ports::TokenServicePort;

/// Login page flow: the user signs in for an app and is sent back to the
/// app's callback with a fresh authorization code.
pub async fn authorize(
    State(state): State<AppState>,
    payload: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<ApiSuccess<AuthorizationData>, ApiError> {
    let Json(body) = payload?;
    let app_id = AppId::new(body.app_id);

    let code = state
        .token_service
        .login_with_app(&app_id, &body.username, &body.password)
        .await?;
    let app = state.app_service.get_app(&app_id).await?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        AuthorizationData {
            redirect_uri: app.callback.with_code(code.code.as_str()),
            code: code.code.to_string(),
        },
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorizeRequest {
    app_id: String,
    username: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationData {
    pub code: String,
    pub redirect_uri: String,
}
