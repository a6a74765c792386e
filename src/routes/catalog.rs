use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::catalog::{
        CatalogModelList, CatalogModelRequest, CategoryList, CategoryRequest,
        CreateSubCategoryRequest, SubCategoriesByCategoriesRequest, SubCategoryList,
        UpdateCatalogModelRequest, UpdateSubCategoryRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{CatalogModel, Category, SubCategory},
    response::ApiResponse,
    services::catalog_service,
    state::AppState,
};

pub fn categories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/{id}", put(update_category).delete(delete_category))
}

pub fn subcategories_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_sub_categories).post(create_sub_category))
        .route("/by-categories", post(sub_categories_by_categories))
        .route("/{id}", put(update_sub_category).delete(delete_sub_category))
}

pub fn models_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_models).post(create_model))
        .route("/{id}", put(update_model).delete(delete_model))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses((status = 200, description = "All categories", body = ApiResponse<CategoryList>)),
    tag = "Catalog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let resp = state.timed(catalog_service::list_categories(&state)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 409, description = "Name already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Category>>)> {
    let resp = catalog_service::create_category(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = ApiResponse<Category>),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    let resp = catalog_service::update_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/categories/{id}",
    params(("id" = Uuid, Path, description = "Category ID")),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 404, description = "Category not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/subcategories",
    responses((status = 200, description = "All subcategories with their parents", body = ApiResponse<SubCategoryList>)),
    tag = "Catalog"
)]
pub async fn list_sub_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<SubCategoryList>>> {
    let resp = state
        .timed(catalog_service::list_sub_categories(&state))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/subcategories/by-categories",
    request_body = SubCategoriesByCategoriesRequest,
    responses((status = 200, description = "Subcategories under any of the categories", body = ApiResponse<SubCategoryList>)),
    tag = "Catalog"
)]
pub async fn sub_categories_by_categories(
    State(state): State<AppState>,
    Json(payload): Json<SubCategoriesByCategoriesRequest>,
) -> AppResult<Json<ApiResponse<SubCategoryList>>> {
    let resp = state
        .timed(catalog_service::sub_categories_by_categories(&state, payload))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/subcategories",
    request_body = CreateSubCategoryRequest,
    responses(
        (status = 201, description = "Subcategory created", body = ApiResponse<SubCategory>),
        (status = 400, description = "Missing or unknown parent categories")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_sub_category(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateSubCategoryRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<SubCategory>>)> {
    let resp = catalog_service::create_sub_category(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/subcategories/{id}",
    params(("id" = Uuid, Path, description = "Subcategory ID")),
    request_body = UpdateSubCategoryRequest,
    responses(
        (status = 200, description = "Subcategory updated", body = ApiResponse<SubCategory>),
        (status = 404, description = "Subcategory not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_sub_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateSubCategoryRequest>,
) -> AppResult<Json<ApiResponse<SubCategory>>> {
    let resp = catalog_service::update_sub_category(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/subcategories/{id}",
    params(("id" = Uuid, Path, description = "Subcategory ID")),
    responses(
        (status = 200, description = "Subcategory deleted"),
        (status = 404, description = "Subcategory not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_sub_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_sub_category(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/models",
    responses((status = 200, description = "Product models", body = ApiResponse<CatalogModelList>)),
    tag = "Catalog"
)]
pub async fn list_models(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CatalogModelList>>> {
    let resp = state
        .timed(catalog_service::list_catalog_models(&state))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/models",
    request_body = CatalogModelRequest,
    responses((status = 201, description = "Model created", body = ApiResponse<CatalogModel>)),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn create_model(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CatalogModelRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<CatalogModel>>)> {
    let resp = state
        .timed(catalog_service::create_catalog_model(&state, &user, payload))
        .await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/models/{id}",
    params(("id" = Uuid, Path, description = "Model ID")),
    request_body = UpdateCatalogModelRequest,
    responses(
        (status = 200, description = "Model updated", body = ApiResponse<CatalogModel>),
        (status = 404, description = "Model not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn update_model(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCatalogModelRequest>,
) -> AppResult<Json<ApiResponse<CatalogModel>>> {
    let resp = state
        .timed(catalog_service::update_catalog_model(&state, &user, id, payload))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/models/{id}",
    params(("id" = Uuid, Path, description = "Model ID")),
    responses(
        (status = 200, description = "Model deleted, products detached"),
        (status = 404, description = "Model not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Catalog"
)]
pub async fn delete_model(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = catalog_service::delete_catalog_model(&state, &user, id).await?;
    Ok(Json(resp))
}
