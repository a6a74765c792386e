use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch},
};

use crate::{
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewStatusRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Review,
    response::ApiResponse,
    routes::params::ReviewListQuery,
    services::review_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_reviews).post(create_review))
        .route("/status", patch(update_review_status))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Review filed as pending", body = ApiResponse<Review>),
        (status = 400, description = "Rating out of range or empty comment"),
        (status = 403, description = "Order not owned or not completed"),
        (status = 409, description = "Order item already reviewed")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Review>>)> {
    let resp = review_service::create_review(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    patch,
    path = "/api/reviews/status",
    request_body = UpdateReviewStatusRequest,
    responses(
        (status = 200, description = "Status changed, product rating recomputed", body = ApiResponse<Review>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Review not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn update_review_status(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateReviewStatusRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let resp = review_service::update_review_status(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/reviews",
    params(ReviewListQuery),
    responses(
        (status = 200, description = "Reviews for moderation", body = ApiResponse<ReviewList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ReviewListQuery>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = state
        .timed(review_service::list_reviews(&state, &user, query))
        .await?;
    Ok(Json(resp))
}
