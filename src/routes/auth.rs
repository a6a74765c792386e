use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::auth::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest, ResetPasswordRequest,
        UpdateProfileRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::auth_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/me", get(me).put(update_me))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<User>),
        (status = 400, description = "Invalid registration data"),
        (status = 409, description = "Email or phone number already used")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = auth_service::register_user(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<ApiResponse<LoginResponse>>> {
    let resp = auth_service::login_user(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = state.timed(auth_service::me(&state, &user)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/auth/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<User>),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = state
        .timed(auth_service::update_profile(&state, &user, payload))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "Reset code sent"),
        (status = 404, description = "Unknown user")
    ),
    tag = "Auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::forgot_password(&state, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Invalid or expired code")
    ),
    tag = "Auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = auth_service::reset_password(&state, payload).await?;
    Ok(Json(resp))
}
