use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use crate::app::models::AppId;
use crate::inbound::http::router::AppState;
use crate::token::models::ClientCredentials;
use crate::token::models::Code;
use crate::token::models::ExchangeCommand;
use crate::token::models::Grant;
use crate::token::models::TokenPair;
use crate::token::ports::TokenServicePort;

/// Token endpoint: every grant type goes through the single exchange entry point.
pub async fn token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<ApiSuccess<TokenPair>, ApiError> {
    let Json(body) = payload?;

    state
        .token_service
        .exchange(body.into_command())
        .await
        .map_err(ApiError::from)
        .map(|pair| ApiSuccess::new(StatusCode::OK, pair))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "grant_type", rename_all = "snake_case")]
pub enum GrantRequest {
    AuthorizationCode { code: String },
    Password { username: String, password: String },
    RefreshToken { refresh_token: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenRequest {
    #[serde(flatten)]
    grant: GrantRequest,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl TokenRequest {
    fn into_command(self) -> ExchangeCommand {
        let grant = match self.grant {
            GrantRequest::AuthorizationCode { code } => Grant::AuthorizationCode {
                code: Code::new(code),
            },
            GrantRequest::Password { username, password } => {
                Grant::Password { username, password }
            }
            GrantRequest::RefreshToken { refresh_token } => Grant::RefreshToken { refresh_token },
        };

        let command = ExchangeCommand::new(grant);
        match self.client_id {
            Some(client_id) => command.with_client(ClientCredentials {
                app_id: AppId::new(client_id),
                secret: self.client_secret,
            }),
            None => command,
        }
    }
}
