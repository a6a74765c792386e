use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::orders::{
        CreateOrderRequest, MonthlySales, OrderItemQuantityUpdated, OrderList, OrderTracking,
        OrderWithItems, ReviewableOrder, TopSeller, UpdateOrderItemQuantityRequest,
        UpdateOrderStatusRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Order,
    response::ApiResponse,
    routes::params::{OrderListQuery, Pagination},
    services::{admin_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_all_orders).post(create_order))
        .route("/mine", get(list_my_orders))
        .route("/client/{user_id}", get(list_client_orders))
        .route("/stats/top-sellers", get(top_sellers))
        .route("/stats/monthly", get(monthly_sales))
        .route("/items/{order_item_id}", put(update_order_item_quantity))
        .route("/{id}", get(get_order))
        .route("/{id}/status", put(update_order_status))
        .route("/{id}/review", get(get_order_for_review))
        .route("/{id}/track", get(track_order))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order placed at current prices", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Empty order, bad quantity or unknown product"),
        (status = 403, description = "Clients only")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithItems>>)> {
    let resp = order_service::create_order(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/orders/mine",
    params(Pagination),
    responses((status = 200, description = "Caller's orders", body = ApiResponse<OrderList>)),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_my_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = state
        .timed(order_service::list_my_orders(&state, &user, pagination))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = state
        .timed(admin_service::list_all_orders(&state, &user, query))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/client/{user_id}",
    params(
        ("user_id" = Uuid, Path, description = "Client ID"),
        Pagination
    ),
    responses((status = 200, description = "One client's orders", body = ApiResponse<OrderList>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_client_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Path(user_id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let query = OrderListQuery {
        page: pagination.page,
        per_page: pagination.per_page,
        user_id: Some(user_id),
        ..Default::default()
    };
    let resp = state
        .timed(admin_service::list_all_orders(&state, &user, query))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats/top-sellers",
    responses((status = 200, description = "Five best selling products", body = ApiResponse<Vec<TopSeller>>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn top_sellers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<TopSeller>>>> {
    let resp = state.timed(admin_service::top_sellers(&state, &user)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/stats/monthly",
    responses((status = 200, description = "Orders per month", body = ApiResponse<Vec<MonthlySales>>)),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn monthly_sales(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<MonthlySales>>>> {
    let resp = state
        .timed(admin_service::monthly_sales(&state, &user))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order with its lines", body = ApiResponse<OrderWithItems>),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = state
        .timed(order_service::get_order(&state, &user, id))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let resp = order_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/orders/items/{order_item_id}",
    params(("order_item_id" = Uuid, Path, description = "Order item ID")),
    request_body = UpdateOrderItemQuantityRequest,
    responses(
        (status = 200, description = "Quantity changed, order total recomputed", body = ApiResponse<OrderItemQuantityUpdated>),
        (status = 404, description = "Item, product or order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_item_quantity(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_item_id): Path<Uuid>,
    Json(payload): Json<UpdateOrderItemQuantityRequest>,
) -> AppResult<Json<ApiResponse<OrderItemQuantityUpdated>>> {
    let resp =
        order_service::update_order_item_quantity(&state, &user, order_item_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/review",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Reviewable products of a completed order", body = ApiResponse<ReviewableOrder>),
        (status = 403, description = "Not the owner, or order not completed"),
        (status = 404, description = "Order not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order_for_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ReviewableOrder>>> {
    let resp = state
        .timed(order_service::get_order_for_review(&state, &user, id))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/track",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
        (status = 200, description = "Order status", body = ApiResponse<OrderTracking>),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn track_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let resp = state.timed(order_service::track_order(&state, id)).await?;
    Ok(Json(resp))
}
