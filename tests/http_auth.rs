mod support;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use storefront_api::{
    entity::users::Role, routes::app_router, services::auth_service::issue_token,
};
use support::{create_product, product_request, seed_catalog, setup};
use tower::ServiceExt;
use uuid::Uuid;

async fn status_of(app: axum::Router, method: &str, uri: &str, token: Option<&str>) -> StatusCode {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let response = app
        .oneshot(request.body(Body::empty()).expect("request"))
        .await
        .expect("response");
    response.status()
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() -> anyhow::Result<()> {
    let app = setup().await?;
    let router = app_router(app.state.clone());

    assert_eq!(status_of(router.clone(), "GET", "/api/orders/mine", None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        status_of(router.clone(), "GET", "/api/orders/mine", Some("garbage")).await,
        StatusCode::UNAUTHORIZED
    );

    let forged = issue_token(
        &storefront_api::config::AppConfig::for_database("sqlite::memory:", "another-secret"),
        Uuid::new_v4(),
        Role::Admin,
    )?;
    assert_eq!(
        status_of(router, "GET", "/api/orders", Some(&forged)).await,
        StatusCode::UNAUTHORIZED
    );
    Ok(())
}

#[tokio::test]
async fn staff_routes_reject_clients() -> anyhow::Result<()> {
    let app = setup().await?;
    let router = app_router(app.state.clone());

    let client = issue_token(&app.state.config, Uuid::new_v4(), Role::Client)?;
    let admin = issue_token(&app.state.config, Uuid::new_v4(), Role::Admin)?;
    let superadmin = issue_token(&app.state.config, Uuid::new_v4(), Role::SuperAdmin)?;

    assert_eq!(
        status_of(router.clone(), "GET", "/api/orders", Some(&client)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(router.clone(), "GET", "/api/reviews", Some(&client)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(router.clone(), "GET", "/api/orders", Some(&admin)).await,
        StatusCode::OK
    );
    assert_eq!(
        status_of(router, "GET", "/api/orders/stats/monthly", Some(&superadmin)).await,
        StatusCode::OK
    );
    Ok(())
}

#[tokio::test]
async fn public_routes_and_fallback() -> anyhow::Result<()> {
    let app = setup().await?;
    let router = app_router(app.state.clone());

    assert_eq!(status_of(router.clone(), "GET", "/health", None).await, StatusCode::OK);
    assert_eq!(status_of(router.clone(), "GET", "/health/ready", None).await, StatusCode::OK);
    assert_eq!(status_of(router.clone(), "GET", "/api/products/visible", None).await, StatusCode::OK);
    assert_eq!(
        status_of(router.clone(), "GET", &format!("/api/orders/{}/track", Uuid::new_v4()), None).await,
        StatusCode::NOT_FOUND
    );
    assert_eq!(status_of(router, "GET", "/nowhere", None).await, StatusCode::NOT_FOUND);
    Ok(())
}

async fn json_of(app: axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    let body = body.map(|b| Body::from(b.to_string())).unwrap_or_else(Body::empty);
    let response = app
        .oneshot(request.body(body).expect("request"))
        .await
        .expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.expect("body");
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn user_listing_is_staff_only() -> anyhow::Result<()> {
    let app = setup().await?;
    let router = app_router(app.state.clone());

    let client = issue_token(&app.state.config, Uuid::new_v4(), Role::Client)?;
    let admin = issue_token(&app.state.config, Uuid::new_v4(), Role::Admin)?;
    let superadmin = issue_token(&app.state.config, Uuid::new_v4(), Role::SuperAdmin)?;

    assert_eq!(status_of(router.clone(), "GET", "/api/users", None).await, StatusCode::UNAUTHORIZED);
    assert_eq!(
        status_of(router.clone(), "GET", "/api/users", Some(&client)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(status_of(router.clone(), "GET", "/api/users", Some(&admin)).await, StatusCode::OK);
    assert_eq!(status_of(router, "GET", "/api/users", Some(&superadmin)).await, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn inquiry_forms_are_public_but_the_inbox_is_not() -> anyhow::Result<()> {
    let app = setup().await?;
    let router = app_router(app.state.clone());
    let client = issue_token(&app.state.config, Uuid::new_v4(), Role::Client)?;
    let admin = issue_token(&app.state.config, Uuid::new_v4(), Role::Admin)?;

    let (status, body) = json_of(
        router.clone(),
        "POST",
        "/api/inquiries/quote",
        Some(json!({
            "name": "Ada",
            "company": "Engines Ltd",
            "email": "ada@example.com",
            "phonenumber": "0102030405",
            "message": "Forty hoodies, please"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["kind"], "quote");
    assert_eq!(body["data"]["read"], false);

    assert_eq!(
        status_of(router.clone(), "GET", "/api/inquiries/quote", None).await,
        StatusCode::UNAUTHORIZED
    );
    assert_eq!(
        status_of(router.clone(), "GET", "/api/inquiries/quote", Some(&client)).await,
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        status_of(router.clone(), "GET", "/api/inquiries/quote", Some(&admin)).await,
        StatusCode::OK
    );
    assert_eq!(
        status_of(router, "GET", "/api/inquiries/complaints", Some(&admin)).await,
        StatusCode::BAD_REQUEST
    );
    Ok(())
}

#[tokio::test]
async fn prices_are_served_as_decimal_amounts() -> anyhow::Result<()> {
    let app = setup().await?;
    let catalog = seed_catalog(&app.state).await?;
    let mut request = product_request("Hoodie", 1999, catalog.model_id, vec![catalog.category_id]);
    request.oldprice = Some(2500);
    let product = create_product(&app.state, &catalog.staff, request).await?;

    let (status, body) = json_of(
        app_router(app.state.clone()),
        "GET",
        &format!("/api/products/{}", product.id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], json!(19.99));
    assert_eq!(body["data"]["oldprice"], json!(25.0));
    Ok(())
}
