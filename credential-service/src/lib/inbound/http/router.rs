use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::authenticate::authenticate;
use super::handlers::authorize::authorize;
use super::handlers::change_password::change_password;
use super::handlers::create_app::create_app;
use super::handlers::create_user::create_user;
use super::handlers::current_user::current_user;
use super::handlers::delete_user::delete_user;
use super::handlers::get_app::get_app;
use super::handlers::info::health;
use super::handlers::info::info;
use super::handlers::issue_code::issue_code;
use super::handlers::list_apps::list_apps;
use super::handlers::list_tokens::list_tokens;
use super::handlers::remove_app::remove_app;
use super::handlers::revoke_tokens::revoke_tokens;
use super::handlers::token::token;
use super::middleware::authenticate as auth_middleware;
use crate::app::ports::AppServicePort;
use crate::token::ports::TokenServicePort;
use crate::user::ports::UserServicePort;

/// Public facts about the running service.
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub url: String,
    pub issuer: String,
}

#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServicePort>,
    pub app_service: Arc<dyn AppServicePort>,
    pub token_service: Arc<dyn TokenServicePort>,
    pub service_info: ServiceInfo,
}

pub fn create_router(
    user_service: Arc<dyn UserServicePort>,
    app_service: Arc<dyn AppServicePort>,
    token_service: Arc<dyn TokenServicePort>,
    service_info: ServiceInfo,
) -> Router {
    let state = AppState {
        user_service,
        app_service,
        token_service,
        service_info,
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                path = %request.uri().path(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                path = %request.uri().path(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    // Paths listed in `middleware::PUBLIC_PATHS` bypass authentication.
    Router::new()
        .route("/health", get(health))
        .route("/api/info", get(info))
        .route("/api/users", post(create_user))
        .route("/api/users/me", delete(delete_user))
        .route("/api/users/me/password", post(change_password))
        .route("/api/users/me/tokens", get(list_tokens).delete(revoke_tokens))
        .route("/api/auth/login", post(authenticate))
        .route("/api/auth/current", get(current_user))
        .route("/api/oauth/authorize", post(authorize))
        .route("/api/oauth/code", post(issue_code))
        .route("/api/oauth/token", post(token))
        .route("/api/apps", post(create_app).get(list_apps))
        .route("/api/apps/info", get(get_app))
        .route("/api/apps/:app_id", delete(remove_app))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
