use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    response::{ApiResponse, Meta},
    state::AppState,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Process is up", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<ApiResponse<HealthData>> {
    Json(ApiResponse::success(
        "Health check",
        health_data("ok"),
        Some(Meta::empty()),
    ))
}

#[utoipa::path(
    get,
    path = "/health/ready",
    responses(
        (status = 200, description = "Database reachable", body = ApiResponse<HealthData>),
        (status = 500, description = "Database unreachable"),
        (status = 504, description = "Database did not answer in time"),
    ),
    tag = "Health"
)]
pub async fn readiness(State(state): State<AppState>) -> AppResult<Json<ApiResponse<HealthData>>> {
    state
        .timed(async { state.orm.ping().await.map_err(AppError::from) })
        .await?;
    Ok(Json(ApiResponse::success(
        "Ready",
        health_data("ready"),
        Some(Meta::empty()),
    )))
}

fn health_data(status: &str) -> HealthData {
    HealthData {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
