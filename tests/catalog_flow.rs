mod support;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    cache::invalidate_catalog,
    dto::{
        catalog::SubCategoriesByCategoriesRequest, products::UpdateProductRequest,
        widgets::CreateWidgetRequest,
    },
    entity::{
        products::{ActiveModel as ProductActive, ImageList},
        users::Role,
        widgets::WidgetKind,
    },
    error::AppError,
    routes::params::{Pagination, ProductFilterQuery},
    services::{catalog_service, product_service, widget_service},
};
use support::{
    create_category, create_product, create_sub_category, create_user, product_request,
    seed_catalog, setup,
};
use uuid::Uuid;

#[tokio::test]
async fn visible_listing_pages_and_trims_images() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;

    for n in 0..25 {
        create_product(
            state,
            &catalog.staff,
            product_request(&format!("Item {n:02}"), 100 + n, catalog.model_id, vec![catalog.category_id]),
        )
        .await?;
    }
    let mut hidden = product_request("Hidden", 100, catalog.model_id, vec![catalog.category_id]);
    hidden.visible = false;
    create_product(state, &catalog.staff, hidden).await?;

    let page = product_service::list_visible_products(state, Pagination::new(3, 10))
        .await?
        .data
        .expect("page");
    assert_eq!(page.pagination.total, 25);
    assert_eq!(page.pagination.total_pages, 3);
    assert_eq!(page.pagination.page, 3);
    assert_eq!(page.products.len(), 5);
    assert!(page.products.iter().all(|p| p.images.len() == 2));
    assert!(page.products.iter().all(|p| p.categories == vec!["Apparel".to_string()]));
    assert!(page.products.iter().all(|p| p.name != "Hidden"));
    Ok(())
}

#[tokio::test]
async fn listing_is_served_from_cache_until_invalidated() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    create_product(
        state,
        &catalog.staff,
        product_request("Cached", 100, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;

    let first = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(first.pagination.total, 1);

    // Written behind the service's back, so nothing invalidates the cache.
    let now = Utc::now();
    ProductActive {
        id: Set(Uuid::new_v4()),
        name: Set("Sneaky".into()),
        description: Set("inserted directly".into()),
        price: Set(100),
        oldprice: Set(None),
        stock: Set(1),
        visible: Set(true),
        stock_availability: Set(true),
        average_rating: Set(0.0),
        images: Set(ImageList::default()),
        options: Set(None),
        model_id: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    let second = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(second, first);

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    let third = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(third.pagination.total, 2);
    Ok(())
}

#[tokio::test]
async fn product_mutations_invalidate_listings() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let product = create_product(
        state,
        &catalog.staff,
        product_request("Lamp", 100, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;

    let before = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(before.products[0].price, 100);

    product_service::update_product(
        state,
        &catalog.staff,
        product.id,
        UpdateProductRequest {
            price: Some(250),
            ..Default::default()
        },
    )
    .await?;

    let after = product_service::list_visible_products(state, Pagination::default())
        .await?
        .data
        .expect("page");
    assert_eq!(after.products[0].price, 250);
    Ok(())
}

#[tokio::test]
async fn filter_by_category_and_subcategory_names() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let footwear = create_category(state, &catalog.staff, "Footwear").await?;
    let boots = create_sub_category(state, &catalog.staff, "Boots", vec![footwear]).await?;

    create_product(
        state,
        &catalog.staff,
        product_request("Shirt", 100, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    let mut hiker = product_request("Hiker", 300, catalog.model_id, vec![footwear]);
    hiker.sub_category_ids = vec![boots];
    create_product(state, &catalog.staff, hiker).await?;
    create_product(
        state,
        &catalog.staff,
        product_request("Sandal", 200, catalog.model_id, vec![footwear]),
    )
    .await?;

    let by_category = product_service::get_products_by_filter(
        state,
        ProductFilterQuery {
            category: Some("Footwear".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("page");
    assert_eq!(by_category.pagination.total, 2);
    assert_eq!(by_category.pagination.limit, 10);

    let by_sub = product_service::get_products_by_filter(
        state,
        ProductFilterQuery {
            category: Some("Footwear".into()),
            subcategory: Some("Boots".into()),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("page");
    assert_eq!(by_sub.pagination.total, 1);
    assert_eq!(by_sub.products[0].name, "Hiker");
    assert_eq!(by_sub.products[0].subcategories, vec!["Boots".to_string()]);

    let err = product_service::get_products_by_filter(
        state,
        ProductFilterQuery {
            category: Some("Nope".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = product_service::get_products_by_filter(
        state,
        ProductFilterQuery {
            subcategory: Some("Nope".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn product_taxonomy_is_validated() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let footwear = create_category(state, &catalog.staff, "Footwear").await?;
    let boots = create_sub_category(state, &catalog.staff, "Boots", vec![footwear]).await?;

    // Boots hang under Footwear, not Apparel.
    let mut wrong_parent = product_request("Odd", 100, catalog.model_id, vec![catalog.category_id]);
    wrong_parent.sub_category_ids = vec![boots];
    let err = product_service::create_product(state, &catalog.staff, wrong_parent)
        .await
        .unwrap_err();
    match err {
        AppError::BadRequest(msg) => assert!(msg.contains(&boots.to_string())),
        other => panic!("expected BadRequest, got {other:?}"),
    }

    let unknown_category = product_request("Ghost", 100, catalog.model_id, vec![Uuid::new_v4()]);
    let err = product_service::create_product(state, &catalog.staff, unknown_category)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let mut unknown_sub = product_request("Ghost", 100, catalog.model_id, vec![footwear]);
    unknown_sub.sub_category_ids = vec![Uuid::new_v4()];
    let err = product_service::create_product(state, &catalog.staff, unknown_sub)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let unknown_model = product_request("Ghost", 100, Uuid::new_v4(), vec![footwear]);
    let err = product_service::create_product(state, &catalog.staff, unknown_model)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let free = product_request("Free", 0, catalog.model_id, vec![footwear]);
    let err = product_service::create_product(state, &catalog.staff, free)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Either parent satisfies the check once both are supplied.
    let mut both = product_request("Both", 100, catalog.model_id, vec![catalog.category_id, footwear]);
    both.sub_category_ids = vec![boots];
    create_product(state, &catalog.staff, both).await?;

    let client = create_user(state, Role::Client, "client@example.com").await?;
    let err = product_service::create_product(
        state,
        &client,
        product_request("Nope", 100, catalog.model_id, vec![footwear]),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    Ok(())
}

#[tokio::test]
async fn subcategories_by_categories_returns_children() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let footwear = create_category(state, &catalog.staff, "Footwear").await?;
    create_sub_category(state, &catalog.staff, "Boots", vec![footwear]).await?;
    create_sub_category(state, &catalog.staff, "Hoodies", vec![catalog.category_id]).await?;

    let subs = catalog_service::sub_categories_by_categories(
        state,
        SubCategoriesByCategoriesRequest {
            category_ids: vec![footwear],
        },
    )
    .await?
    .data
    .expect("subcategories");
    assert_eq!(subs.items.len(), 1);
    assert_eq!(subs.items[0].name, "Boots");
    assert_eq!(subs.items[0].category_ids, vec![footwear]);

    let err = create_sub_category(state, &catalog.staff, "Orphan", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<AppError>(), Some(AppError::BadRequest(_))));
    Ok(())
}

#[tokio::test]
async fn visible_widgets_list_visible_products_in_order() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let catalog = seed_catalog(state).await?;
    let first = create_product(
        state,
        &catalog.staff,
        product_request("First", 100, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    let second = create_product(
        state,
        &catalog.staff,
        product_request("Second", 100, catalog.model_id, vec![catalog.category_id]),
    )
    .await?;
    let mut hidden = product_request("Hidden", 100, catalog.model_id, vec![catalog.category_id]);
    hidden.visible = false;
    let hidden = create_product(state, &catalog.staff, hidden).await?;

    widget_service::create_widget(
        state,
        &catalog.staff,
        CreateWidgetRequest {
            name: "Featured".into(),
            kind: WidgetKind::Carousel,
            visible: true,
            product_ids: vec![second.id, hidden.id, first.id],
        },
    )
    .await?;

    let views = widget_service::list_visible_widgets(state)
        .await?
        .data
        .expect("widgets");
    assert_eq!(views.len(), 1);
    let names: Vec<&str> = views[0].products.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Second", "First"]);

    let err = widget_service::create_widget(
        state,
        &catalog.staff,
        CreateWidgetRequest {
            name: "Broken".into(),
            kind: WidgetKind::Carousel,
            visible: true,
            product_ids: vec![Uuid::new_v4()],
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
    Ok(())
}
