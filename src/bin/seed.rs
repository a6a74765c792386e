use anyhow::anyhow;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        catalog::{CatalogModelRequest, CategoryRequest, CreateSubCategoryRequest},
        products::CreateProductRequest,
    },
    entity::{
        catalog_models, categories, products, sub_categories,
        users::{self, Role},
    },
    middleware::auth::AuthUser,
    services::{auth_service, catalog_service, product_service},
    state::AppState,
};
use uuid::Uuid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let state = AppState::new(orm, config);

    let admin_id = ensure_user(&state, "Admin", "admin@example.com", "admin123", Role::Admin).await?;
    let client_id = ensure_user(&state, "Client", "client@example.com", "client123", Role::Client).await?;
    let admin = AuthUser {
        user_id: admin_id,
        role: Role::Admin,
    };
    seed_catalog(&state, &admin).await?;

    println!("Seed completed. Admin ID: {admin_id}, Client ID: {client_id}");
    Ok(())
}

async fn ensure_user(
    state: &AppState,
    firstname: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    let existing = users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(&state.orm)
        .await?;
    if let Some(user) = existing {
        println!("User {email} already present");
        return Ok(user.id);
    }

    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        firstname: Set(firstname.to_string()),
        lastname: Set(None),
        email: Set(Some(email.to_string())),
        phonenumber: Set(None),
        password_hash: Set(auth_service::hash_secret(password)?),
        role: Set(role),
        reset_code_hash: Set(None),
        reset_code_expires_at: Set(None),
        address: Set(None),
        city: Set(None),
        zip_code: Set(None),
        country: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;

    println!("Ensured user {email} (role={role:?})");
    Ok(user.id)
}

async fn seed_catalog(state: &AppState, admin: &AuthUser) -> anyhow::Result<()> {
    if products::Entity::find().one(&state.orm).await?.is_some() {
        println!("Catalog already seeded");
        return Ok(());
    }

    let category_id = match categories::Entity::find()
        .filter(categories::Column::Name.eq("Apparel"))
        .one(&state.orm)
        .await?
    {
        Some(c) => c.id,
        None => catalog_service::create_category(
            state,
            admin,
            CategoryRequest {
                name: "Apparel".to_string(),
            },
        )
        .await?
        .data
        .map(|c| c.id)
        .ok_or_else(|| anyhow!("category was not returned"))?,
    };

    let sub_category_id = match sub_categories::Entity::find()
        .filter(sub_categories::Column::Name.eq("Hoodies"))
        .one(&state.orm)
        .await?
    {
        Some(s) => s.id,
        None => catalog_service::create_sub_category(
            state,
            admin,
            CreateSubCategoryRequest {
                name: "Hoodies".to_string(),
                category_ids: vec![category_id],
            },
        )
        .await?
        .data
        .map(|s| s.id)
        .ok_or_else(|| anyhow!("subcategory was not returned"))?,
    };

    let model_id = match catalog_models::Entity::find()
        .filter(catalog_models::Column::Name.eq("Classic"))
        .one(&state.orm)
        .await?
    {
        Some(m) => m.id,
        None => catalog_service::create_catalog_model(
            state,
            admin,
            CatalogModelRequest {
                name: "Classic".to_string(),
                image: None,
                options: None,
            },
        )
        .await?
        .data
        .map(|m| m.id)
        .ok_or_else(|| anyhow!("model was not returned"))?,
    };

    let catalog = [
        ("Ferris Hoodie", "Warm hoodie for Rustaceans", 5_500, 50, true),
        ("Crab Zip Hoodie", "Zip-up with an embroidered crab", 6_200, 30, true),
        ("Borrow Checker Tee", "Soft cotton tee", 2_000, 100, false),
        ("Lifetime Socks", "They outlive their owner", 900, 200, false),
    ];
    for (name, description, price, stock, hooded) in catalog {
        let sub_category_ids = if hooded { vec![sub_category_id] } else { Vec::new() };
        product_service::create_product(
            state,
            admin,
            CreateProductRequest {
                name: name.to_string(),
                description: description.to_string(),
                price,
                oldprice: None,
                stock,
                visible: true,
                stock_availability: true,
                images: vec![
                    format!("/images/{}-front.jpg", slug(name)),
                    format!("/images/{}-back.jpg", slug(name)),
                    format!("/images/{}-detail.jpg", slug(name)),
                ],
                options: None,
                model_id,
                category_ids: vec![category_id],
                sub_category_ids,
            },
        )
        .await?;
    }

    println!("Seeded catalog");
    Ok(())
}

fn slug(name: &str) -> String {
    name.to_lowercase().replace(' ', "-")
}
