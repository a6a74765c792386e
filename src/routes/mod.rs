use axum::{
    Json, Router,
    http::{StatusCode, Uri},
    routing::get,
};
use tower_http::cors::CorsLayer;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

pub mod auth;
pub mod catalog;
pub mod doc;
pub mod health;
pub mod inquiries;
pub mod orders;
pub mod params;
pub mod products;
pub mod reviews;
pub mod users;
pub mod widgets;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/categories", catalog::categories_router())
        .nest("/subcategories", catalog::subcategories_router())
        .nest("/models", catalog::models_router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/widgets", widgets::router())
        .nest("/inquiries", inquiries::router())
        .nest("/users", users::router())
}

/// Health, API and docs with state bound; transport layers are added by the binary.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness))
        .nest("/api", create_api_router())
        .merge(doc::scalar_docs())
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn not_found(uri: Uri) -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    let body = ApiResponse::success(
        "Not Found",
        serde_json::json!({ "path": uri.path() }),
        Some(Meta::empty()),
    );
    (StatusCode::NOT_FOUND, Json(body))
}
