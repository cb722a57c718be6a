use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;
use crate::token::models::ExchangeCommand;
use crate::token::models::Grant;
use crate::token::models::TokenPair;
use crate::token::ports::TokenServicePort;

/// Self-scoped password login: a token pair for the user itself, no app involved.
pub async fn authenticate(
    State(state): State<AppState>,
    payload: Result<Json<AuthenticateRequestBody>, JsonRejection>,
) -> Result<ApiSuccess<TokenPair>, ApiError> {
    let Json(body) = payload?;

    let command = ExchangeCommand::new(Grant::Password {
        username: body.username,
        password: body.password,
    });

    state
        .token_service
        .exchange(command)
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, pair))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthenticateRequestBody {
    username: String,
    password: String,
}
