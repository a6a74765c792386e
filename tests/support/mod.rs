#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::Value;
use storefront_api::{
    cache::{CacheError, CacheStore},
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::{
        catalog::{CatalogModelRequest, CategoryRequest, CreateSubCategoryRequest},
        products::CreateProductRequest,
    },
    entity::users::{ActiveModel as UserActive, Role},
    middleware::auth::AuthUser,
    models::Product,
    notify::{Notification, Notifier, NotifyError},
    services::{catalog_service, product_service},
    state::AppState,
};
use uuid::Uuid;

/// Keeps every notification instead of sending it.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn subjects(&self) -> Vec<String> {
        self.sent
            .lock()
            .map(|sent| sent.iter().map(|n| n.subject.clone()).collect())
            .unwrap_or_default()
    }

    pub fn count(&self, subject: &str) -> usize {
        self.subjects().iter().filter(|s| s.as_str() == subject).count()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, notification: Notification) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .map_err(|e| NotifyError::Transport(e.to_string()))?
            .push(notification);
        Ok(())
    }
}

/// Cache backend whose every call hangs for `delay` before succeeding.
pub struct StalledCache {
    pub delay: Duration,
}

#[async_trait]
impl CacheStore for StalledCache {
    async fn get(&self, _key: &str) -> Result<Option<Value>, CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn clear(&self, _key: &str) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }

    async fn clear_prefix(&self, _prefix: &str) -> Result<(), CacheError> {
        tokio::time::sleep(self.delay).await;
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub notifier: Arc<RecordingNotifier>,
}

pub fn test_config() -> AppConfig {
    AppConfig::for_database("sqlite::memory:", "test-secret")
}

/// Fresh in-memory database with the schema applied.
pub async fn setup() -> anyhow::Result<TestApp> {
    setup_with(test_config()).await
}

pub async fn setup_with(config: AppConfig) -> anyhow::Result<TestApp> {
    let orm = create_orm_conn(&config.database_url).await?;
    run_migrations(&orm).await?;
    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState::new(orm, config).with_notifier(notifier.clone());
    Ok(TestApp { state, notifier })
}

/// Lets spawned notification tasks run.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

pub async fn create_user(state: &AppState, role: Role, email: &str) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        firstname: Set("Test".into()),
        lastname: Set(Some("User".into())),
        email: Set(Some(email.into())),
        phonenumber: Set(None),
        password_hash: Set("not-a-real-hash".into()),
        role: Set(role),
        reset_code_hash: Set(None),
        reset_code_expires_at: Set(None),
        address: Set(Some("1 Main Street".into())),
        city: Set(Some("Springfield".into())),
        zip_code: Set(Some("12345".into())),
        country: Set(Some("US".into())),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(AuthUser {
        user_id: user.id,
        role,
    })
}

pub async fn create_category(state: &AppState, staff: &AuthUser, name: &str) -> anyhow::Result<Uuid> {
    let resp = catalog_service::create_category(state, staff, CategoryRequest { name: name.into() }).await?;
    resp.data
        .map(|c| c.id)
        .ok_or_else(|| anyhow::anyhow!("category missing from response"))
}

pub async fn create_sub_category(
    state: &AppState,
    staff: &AuthUser,
    name: &str,
    category_ids: Vec<Uuid>,
) -> anyhow::Result<Uuid> {
    let resp = catalog_service::create_sub_category(
        state,
        staff,
        CreateSubCategoryRequest {
            name: name.into(),
            category_ids,
        },
    )
    .await?;
    resp.data
        .map(|s| s.id)
        .ok_or_else(|| anyhow::anyhow!("subcategory missing from response"))
}

pub async fn create_model(state: &AppState, staff: &AuthUser) -> anyhow::Result<Uuid> {
    let resp = catalog_service::create_catalog_model(
        state,
        staff,
        CatalogModelRequest {
            name: "Standard".into(),
            image: None,
            options: None,
        },
    )
    .await?;
    resp.data
        .map(|m| m.id)
        .ok_or_else(|| anyhow::anyhow!("model missing from response"))
}

pub fn product_request(name: &str, price: i64, model_id: Uuid, category_ids: Vec<Uuid>) -> CreateProductRequest {
    CreateProductRequest {
        name: name.into(),
        description: format!("{name} description"),
        price,
        oldprice: None,
        stock: 10,
        visible: true,
        stock_availability: true,
        images: vec![
            format!("/img/{name}-1.jpg"),
            format!("/img/{name}-2.jpg"),
            format!("/img/{name}-3.jpg"),
        ],
        options: None,
        model_id,
        category_ids,
        sub_category_ids: Vec::new(),
    }
}

pub async fn create_product(
    state: &AppState,
    staff: &AuthUser,
    request: CreateProductRequest,
) -> anyhow::Result<Product> {
    let resp = product_service::create_product(state, staff, request).await?;
    resp.data
        .ok_or_else(|| anyhow::anyhow!("product missing from response"))
}

/// Staff user plus one category and one model to hang products on.
pub struct Catalog {
    pub staff: AuthUser,
    pub category_id: Uuid,
    pub model_id: Uuid,
}

pub async fn seed_catalog(state: &AppState) -> anyhow::Result<Catalog> {
    let staff = create_user(state, Role::Admin, "admin@example.com").await?;
    let category_id = create_category(state, &staff, "Apparel").await?;
    let model_id = create_model(state, &staff).await?;
    Ok(Catalog {
        staff,
        category_id,
        model_id,
    })
}
