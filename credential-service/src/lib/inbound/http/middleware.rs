use auth::Audience;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::token::errors::TokenError;

/// Paths served without a bearer credential.
pub const PUBLIC_PATHS: &[&str] = &[
    "/health",
    "/api/info",
    "/api/users",
    "/api/auth/login",
    "/api/oauth/authorize",
    "/api/oauth/token",
    "/api/apps/info",
];

/// Extension type to store the authenticated identity in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
    pub username: String,
    pub audience: Audience,
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

/// Middleware that resolves the bearer credential of every non-public request
/// to a live access token record and adds the user to request extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if is_public(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let token = extract_token(&req).ok_or(TokenError::AuthRequired)?;

    let identity = state.token_service.validate(&token).await.map_err(|e| {
        tracing::warn!(error = %e, path = %req.uri().path(), "Access token rejected");
        e
    })?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: identity.user.id,
        username: identity.user.username.as_str().to_string(),
        audience: identity.audience,
    });

    Ok(next.run(req).await)
}

pub fn is_public(path: &str) -> bool {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };
    PUBLIC_PATHS.contains(&path)
}

/// Bearer credential from the `Authorization` header, else from `?token=`.
///
/// Other authorization schemes count as no header credential.
fn extract_token(req: &Request) -> Option<String> {
    let from_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string);

    from_header.or_else(|| {
        Query::<TokenQuery>::try_from_uri(req.uri())
            .ok()
            .and_then(|Query(query)| query.token)
            .filter(|token| !token.is_empty())
    })
}
