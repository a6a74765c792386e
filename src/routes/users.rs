use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, put},
};

use crate::{
    dto::users::{ChangePasswordRequest, UserList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::Pagination,
    services::{admin_service, auth_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/password", put(change_password))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(Pagination),
    responses(
        (status = 200, description = "All accounts, newest first", body = ApiResponse<UserList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    let resp = state
        .timed(admin_service::list_users(&state, &user, pagination))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/users/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password wrong or new one too short"),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::change_password(&state, &user, payload).await?;
    Ok(Json(resp))
}
