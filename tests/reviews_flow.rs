mod support;

use storefront_api::{
    dto::{
        orders::{CreateOrderRequest, OrderItemRequest, UpdateOrderStatusRequest},
        reviews::{CreateReviewRequest, UpdateReviewStatusRequest},
    },
    entity::{reviews::ReviewStatus, users::Role},
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::ReviewListQuery,
    services::{order_service, product_service, review_service},
    state::AppState,
};
use support::{create_product, create_user, product_request, seed_catalog, setup};
use uuid::Uuid;

/// Places a one-line order and returns `(order_id, order_item_id)`.
async fn place_order(state: &AppState, client: &AuthUser, product_id: Uuid) -> anyhow::Result<(Uuid, Uuid)> {
    let created = order_service::create_order(
        state,
        client,
        CreateOrderRequest {
            order_items: vec![OrderItemRequest {
                product: product_id,
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
    Ok((created.order.id, created.items[0].id))
}

async fn complete(state: &AppState, staff: &AuthUser, order_id: Uuid) -> anyhow::Result<()> {
    order_service::update_order_status(
        state,
        staff,
        order_id,
        UpdateOrderStatusRequest {
            status: "completed".into(),
        },
    )
    .await?;
    Ok(())
}

async fn review(
    state: &AppState,
    client: &AuthUser,
    order_item_id: Uuid,
    rating: i32,
) -> Result<Uuid, AppError> {
    let resp = review_service::create_review(
        state,
        client,
        CreateReviewRequest {
            rating,
            comment: "Fits well".into(),
            order_item_id,
        },
    )
    .await?;
    Ok(resp.data.expect("review").id)
}

async fn moderate(state: &AppState, staff: &AuthUser, review_id: Uuid, status: &str) -> anyhow::Result<()> {
    review_service::update_review_status(
        state,
        staff,
        UpdateReviewStatusRequest {
            review_id,
            status: status.into(),
        },
    )
    .await?;
    Ok(())
}

async fn average_of(state: &AppState, product_id: Uuid) -> anyhow::Result<f64> {
    let product = product_service::get_product(state, product_id)
        .await?
        .data
        .expect("product");
    Ok(product.average_rating)
}

#[tokio::test]
async fn only_owners_of_completed_orders_may_review() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let client = create_user(state, Role::Client, "client@example.com").await?;
    let stranger = create_user(state, Role::Client, "stranger@example.com").await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Jacket", 9000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    let (order_id, item_id) = place_order(state, &client, product.id).await?;

    let err = review(state, &client, item_id, 5).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    complete(state, &catalog.staff, order_id).await?;

    let err = review(state, &stranger, item_id, 5).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = review(state, &client, Uuid::new_v4(), 5).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = review(state, &client, item_id, 6).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    let err = review(state, &client, item_id, 0).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let review_id = review(state, &client, item_id, 4).await?;
    let pending = review_service::list_reviews(
        state,
        &catalog.staff,
        ReviewListQuery {
            status: Some("pending".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("reviews");
    assert_eq!(pending.items.len(), 1);
    assert_eq!(pending.items[0].id, review_id);
    assert_eq!(pending.items[0].status, ReviewStatus::Pending);
    assert_eq!(pending.items[0].submitter_name, "Test User");

    let err = review(state, &client, item_id, 3).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    Ok(())
}

#[tokio::test]
async fn average_rating_tracks_approved_reviews() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let first = create_user(state, Role::Client, "first@example.com").await?;
    let second = create_user(state, Role::Client, "second@example.com").await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Boots", 12000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;

    let (order_a, item_a) = place_order(state, &first, product.id).await?;
    let (order_b, item_b) = place_order(state, &second, product.id).await?;
    complete(state, &catalog.staff, order_a).await?;
    complete(state, &catalog.staff, order_b).await?;

    let review_a = review(state, &first, item_a, 4).await?;
    let review_b = review(state, &second, item_b, 1).await?;
    assert_eq!(average_of(state, product.id).await?, 0.0);

    moderate(state, &catalog.staff, review_a, "approved").await?;
    assert_eq!(average_of(state, product.id).await?, 4.0);

    moderate(state, &catalog.staff, review_b, "APPROVED").await?;
    assert_eq!(average_of(state, product.id).await?, 2.5);

    let public = review_service::approved_reviews_for_product(state, product.id)
        .await?
        .data
        .expect("reviews");
    assert_eq!(public.items.len(), 2);

    moderate(state, &catalog.staff, review_a, "rejected").await?;
    assert_eq!(average_of(state, product.id).await?, 1.0);

    moderate(state, &catalog.staff, review_b, "pending").await?;
    assert_eq!(average_of(state, product.id).await?, 0.0);

    let err = moderate(state, &catalog.staff, review_a, "archived").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::BadRequest(_))));

    let err = moderate(state, &first, review_a, "approved").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::Forbidden(_))));

    let err = moderate(state, &catalog.staff, Uuid::new_v4(), "approved").await.unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn reviews_of_unknown_product_are_not_found() -> anyhow::Result<()> {
    let app = setup().await?;
    let err = review_service::approved_reviews_for_product(&app.state, Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn staff_cannot_file_reviews() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let client = create_user(state, Role::Client, "client@example.com").await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Parka", 15000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    let (order_id, item_id) = place_order(state, &client, product.id).await?;
    complete(state, &catalog.staff, order_id).await?;

    let err = review(state, &catalog.staff, item_id, 5).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let pending = review_service::list_reviews(state, &catalog.staff, ReviewListQuery::default())
        .await?
        .data
        .expect("reviews");
    assert!(pending.items.is_empty());
    Ok(())
}

#[tokio::test]
async fn concurrent_moderation_keeps_the_average_exact() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let first = create_user(state, Role::Client, "first@example.com").await?;
    let second = create_user(state, Role::Client, "second@example.com").await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Gloves", 3000, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;

    let (order_a, item_a) = place_order(state, &first, product.id).await?;
    let (order_b, item_b) = place_order(state, &second, product.id).await?;
    complete(state, &catalog.staff, order_a).await?;
    complete(state, &catalog.staff, order_b).await?;
    let review_a = review(state, &first, item_a, 5).await?;
    let review_b = review(state, &second, item_b, 2).await?;

    let (left, right) = tokio::join!(
        moderate(state, &catalog.staff, review_a, "approved"),
        moderate(state, &catalog.staff, review_b, "approved"),
    );
    left?;
    right?;

    let approved = review_service::approved_reviews_for_product(state, product.id)
        .await?
        .data
        .expect("reviews");
    let ratings: Vec<i32> = approved.items.iter().map(|r| r.rating).collect();
    assert_eq!(ratings.len(), 2);
    assert_eq!(average_of(state, product.id).await?, review_service::mean_rating(&ratings));
    assert_eq!(average_of(state, product.id).await?, 3.5);
    Ok(())
}
