use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Product, ProductSummary};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub price: i64,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub oldprice: Option<i64>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default = "default_true")]
    pub stock_availability: bool,
    #[serde(default)]
    pub images: Vec<String>,
    pub options: Option<String>,
    pub model_id: Uuid,
    pub category_ids: Vec<Uuid>,
    #[serde(default)]
    pub sub_category_ids: Vec<Uuid>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<i64>,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub oldprice: Option<i64>,
    pub stock: Option<i32>,
    pub visible: Option<bool>,
    pub stock_availability: Option<bool>,
    pub images: Option<Vec<String>>,
    pub options: Option<String>,
    pub model_id: Option<Uuid>,
    pub category_ids: Option<Vec<Uuid>>,
    pub sub_category_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

/// One page of a storefront listing, as stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ProductPage {
    pub products: Vec<ProductSummary>,
    pub pagination: PageInfo,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct PageInfo {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}
