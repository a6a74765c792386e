use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::inquiries::{
        CreateInquiryRequest, DeleteInquiriesRequest, InquiryList, UpdateInquiryReadRequest,
    },
    entity::inquiries::InquiryKind,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Inquiry,
    response::ApiResponse,
    routes::params::Pagination,
    services::inquiry_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/{kind}",
            get(list_inquiries)
                .post(create_inquiry)
                .delete(delete_inquiries),
        )
        .route("/{kind}/read", put(set_inquiry_read))
        .route("/{kind}/{id}", get(get_inquiry))
}

#[utoipa::path(
    post,
    path = "/api/inquiries/{kind}",
    params(("kind" = InquiryKind, Path, description = "contact or quote")),
    request_body = CreateInquiryRequest,
    responses(
        (status = 201, description = "Inquiry stored unread", body = ApiResponse<Inquiry>),
        (status = 400, description = "Missing field or invalid email")
    ),
    tag = "Inquiries"
)]
pub async fn create_inquiry(
    State(state): State<AppState>,
    Path(kind): Path<InquiryKind>,
    Json(payload): Json<CreateInquiryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Inquiry>>)> {
    let resp = inquiry_service::create_inquiry(&state, kind, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/inquiries/{kind}",
    params(("kind" = InquiryKind, Path, description = "contact or quote"), Pagination),
    responses(
        (status = 200, description = "Inquiries of one kind, newest first", body = ApiResponse<InquiryList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn list_inquiries(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<InquiryKind>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<InquiryList>>> {
    let resp = state
        .timed(inquiry_service::list_inquiries(&state, &user, kind, pagination))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/inquiries/{kind}/{id}",
    params(
        ("kind" = InquiryKind, Path, description = "contact or quote"),
        ("id" = Uuid, Path, description = "Inquiry ID")
    ),
    responses(
        (status = 200, description = "Inquiry", body = ApiResponse<Inquiry>),
        (status = 404, description = "No inquiry of that kind with this id")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn get_inquiry(
    State(state): State<AppState>,
    user: AuthUser,
    Path((kind, id)): Path<(InquiryKind, Uuid)>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let resp = state
        .timed(inquiry_service::get_inquiry(&state, &user, kind, id))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/inquiries/{kind}",
    params(("kind" = InquiryKind, Path, description = "contact or quote")),
    request_body = DeleteInquiriesRequest,
    responses(
        (status = 200, description = "Inquiries deleted"),
        (status = 400, description = "No ids given"),
        (status = 404, description = "None of the ids exist")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn delete_inquiries(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<InquiryKind>,
    Json(payload): Json<DeleteInquiriesRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = inquiry_service::delete_inquiries(&state, &user, kind, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/inquiries/{kind}/read",
    params(("kind" = InquiryKind, Path, description = "contact or quote")),
    request_body = UpdateInquiryReadRequest,
    responses(
        (status = 200, description = "Read flag updated", body = ApiResponse<Inquiry>),
        (status = 404, description = "Inquiry not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Inquiries"
)]
pub async fn set_inquiry_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(kind): Path<InquiryKind>,
    Json(payload): Json<UpdateInquiryReadRequest>,
) -> AppResult<Json<ApiResponse<Inquiry>>> {
    let resp = inquiry_service::set_inquiry_read(&state, &user, kind, payload).await?;
    Ok(Json(resp))
}
