use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

pub async fn info(State(state): State<AppState>) -> Result<ApiSuccess<InfoData>, ApiError> {
    let info = &state.service_info;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        InfoData {
            name: info.name.clone(),
            version: info.version.clone(),
            url: info.url.clone(),
            issuer: info.issuer.clone(),
        },
    ))
}

pub async fn health() -> ApiSuccess<HealthData> {
    ApiSuccess::new(StatusCode::OK, HealthData { status: "ok" })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InfoData {
    pub name: String,
    pub version: String,
    pub url: String,
    pub issuer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthData {
    pub status: &'static str,
}
