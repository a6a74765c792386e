use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, ProductPage, UpdateProductRequest},
    dto::reviews::ReviewList,
    error::AppResult,
    middleware::auth::AuthUser,
    models::Product,
    response::ApiResponse,
    routes::params::{Pagination, ProductFilterQuery},
    services::{product_service, review_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/visible", get(list_visible_products))
        .route("/filter", get(filter_products))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/{id}/reviews", get(product_reviews))
}

#[utoipa::path(
    get,
    path = "/api/products/visible",
    params(Pagination),
    responses(
        (status = 200, description = "Visible products, cached", body = ApiResponse<ProductPage>)
    ),
    tag = "Products"
)]
pub async fn list_visible_products(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductPage>>> {
    let resp = state
        .timed(product_service::list_visible_products(&state, pagination))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/filter",
    params(ProductFilterQuery),
    responses(
        (status = 200, description = "Products in a category or subcategory", body = ApiResponse<ProductPage>),
        (status = 404, description = "Unknown category or subcategory name")
    ),
    tag = "Products"
)]
pub async fn filter_products(
    State(state): State<AppState>,
    Query(query): Query<ProductFilterQuery>,
) -> AppResult<Json<ApiResponse<ProductPage>>> {
    let resp = state
        .timed(product_service::get_products_by_filter(&state, query))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(Pagination),
    responses(
        (status = 200, description = "All products, hidden included", body = ApiResponse<ProductList>),
        (status = 403, description = "Staff only")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = state
        .timed(product_service::list_products(&state, &user, pagination))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = state.timed(product_service::get_product(&state, id)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/reviews",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Approved reviews", body = ApiResponse<ReviewList>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Reviews"
)]
pub async fn product_reviews(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ReviewList>>> {
    let resp = state
        .timed(review_service::approved_reviews_for_product(&state, id))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Invalid product or subcategory outside the chosen categories"),
        (status = 404, description = "Model, category or subcategory not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProductRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product with its reviews and order lines"),
        (status = 404, description = "Product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}
