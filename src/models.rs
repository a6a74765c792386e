use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    catalog_models, categories, inquiries, order_items, orders, reviews, users,
    inquiries::InquiryKind,
    orders::OrderStatus,
    reviews::ReviewStatus,
    users::Role,
    widgets::WidgetKind,
};

/// Listing payloads carry at most this many images.
pub const LISTING_IMAGE_LIMIT: usize = 2;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub firstname: String,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phonenumber: Option<String>,
    pub role: Role,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            firstname: model.firstname,
            lastname: model.lastname,
            email: model.email,
            phonenumber: model.phonenumber,
            role: model.role,
            address: model.address,
            city: model.city,
            zip_code: model.zip_code,
            country: model.country,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubCategory {
    pub id: Uuid,
    pub name: String,
    pub category_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct CatalogModel {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub options: Option<String>,
}

impl From<catalog_models::Model> for CatalogModel {
    fn from(model: catalog_models::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: model.image,
            options: model.options,
        }
    }
}

/// Full product view.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub price: i64,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub oldprice: Option<i64>,
    pub stock: i32,
    pub visible: bool,
    pub stock_availability: bool,
    pub average_rating: f64,
    pub images: Vec<String>,
    pub options: Option<String>,
    pub model: Option<CatalogModel>,
    pub categories: Vec<Category>,
    pub subcategories: Vec<Category>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Denormalized row used by storefront listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub price: i64,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub oldprice: Option<i64>,
    pub stock_availability: bool,
    pub average_rating: f64,
    pub images: Vec<String>,
    pub categories: Vec<String>,
    pub subcategories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub total: i64,
    pub status: OrderStatus,
    pub payment_mode: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            total: model.total,
            status: model.status,
            payment_mode: model.payment_mode,
            address: model.address,
            city: model.city,
            zip_code: model.zip_code,
            country: model.country,
            comment: model.comment,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub price: i64,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
            image: model.image,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub submitter_name: String,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub order_item_id: Uuid,
    pub status: ReviewStatus,
    pub created_at: DateTime<Utc>,
}

impl From<reviews::Model> for Review {
    fn from(model: reviews::Model) -> Self {
        Self {
            id: model.id,
            rating: model.rating,
            comment: model.comment,
            submitter_name: model.submitter_name,
            user_id: model.user_id,
            product_id: model.product_id,
            order_item_id: model.order_item_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Widget {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub visible: bool,
    pub product_ids: Vec<Uuid>,
}

/// A contact message or quote request as the back office sees it.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Inquiry {
    pub id: Uuid,
    pub kind: InquiryKind,
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phonenumber: String,
    pub message: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<inquiries::Model> for Inquiry {
    fn from(model: inquiries::Model) -> Self {
        Self {
            id: model.id,
            kind: model.kind,
            name: model.name,
            company: model.company,
            email: model.email,
            phonenumber: model.phonenumber,
            message: model.message,
            read: model.read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
