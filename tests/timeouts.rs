mod support;

use std::{sync::Arc, time::Duration};

use storefront_api::{
    config::AppConfig,
    dto::{
        orders::{CreateOrderRequest, OrderItemRequest, UpdateOrderStatusRequest},
        products::UpdateProductRequest,
        reviews::{CreateReviewRequest, UpdateReviewStatusRequest},
    },
    entity::users::Role,
    routes::params::Pagination,
    services::{order_service, product_service, review_service},
};
use support::{StalledCache, TestApp, create_product, create_user, product_request, seed_catalog, setup_with, test_config};
use tokio::time::Instant;

async fn stalled_app(db_timeout: Duration, cache_timeout: Duration) -> anyhow::Result<TestApp> {
    let config = AppConfig {
        db_timeout,
        cache_timeout,
        ..test_config()
    };
    let mut app = setup_with(config).await?;
    app.state = app.state.with_cache(Arc::new(StalledCache {
        delay: Duration::from_secs(3),
    }));
    Ok(app)
}

// Invalidation gives up after the cache timeout instead of eating the data-store budget.
#[tokio::test]
async fn hung_cache_does_not_fail_committed_writes() -> anyhow::Result<()> {
    let app = stalled_app(Duration::from_secs(1), Duration::from_millis(100)).await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;

    let started = Instant::now();
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Anorak", 8000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    assert!(started.elapsed() < Duration::from_secs(1));

    let stored = product_service::get_product(state, product.id)
        .await?
        .data
        .expect("product");
    assert_eq!(stored.name, "Anorak");

    let page = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(page.products.len(), 1);

    product_service::delete_product(state, &catalog.staff, product.id).await?;
    Ok(())
}

// Slow post-commit work runs after the transactional budget, not inside it.
#[tokio::test]
async fn post_commit_work_is_outside_the_store_timeout() -> anyhow::Result<()> {
    let app = stalled_app(Duration::from_millis(200), Duration::from_secs(1)).await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let client = create_user(state, Role::Client, "client@example.com").await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Poncho", 4000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;

    let updated = product_service::update_product(
        state,
        &catalog.staff,
        product.id,
        UpdateProductRequest {
            price: Some(4500),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("product");
    assert_eq!(updated.price, 4500);

    let order = order_service::create_order(
        state,
        &client,
        CreateOrderRequest {
            order_items: vec![OrderItemRequest {
                product: product.id,
                quantity: 1,
                image: None,
            }],
            address: None,
            paymentmode: "card".into(),
            city: None,
            zip_code: None,
            country: None,
            comment: None,
            total: None,
        },
    )
    .await?
    .data
    .expect("order");
    order_service::update_order_status(
        state,
        &catalog.staff,
        order.order.id,
        UpdateOrderStatusRequest {
            status: "completed".into(),
        },
    )
    .await?;

    let review = review_service::create_review(
        state,
        &client,
        CreateReviewRequest {
            rating: 4,
            comment: "Keeps the rain out".into(),
            order_item_id: order.items[0].id,
        },
    )
    .await?
    .data
    .expect("review");
    review_service::update_review_status(
        state,
        &catalog.staff,
        UpdateReviewStatusRequest {
            review_id: review.id,
            status: "approved".into(),
        },
    )
    .await?;

    let stored = product_service::get_product(state, product.id)
        .await?
        .data
        .expect("product");
    assert_eq!(stored.average_rating, 4.0);
    Ok(())
}
