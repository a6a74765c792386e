use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct OrderItemRequest {
    /// Product id.
    pub product: Uuid,
    pub quantity: i32,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub order_items: Vec<OrderItemRequest>,
    pub address: Option<String>,
    pub paymentmode: String,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
    pub comment: Option<String>,
    /// Client-side total; never trusted, only compared for logging.
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub total: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderItemQuantityRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderItemQuantityUpdated {
    pub order_item: OrderItem,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub total: i64,
}

/// An order reduced to what the review screen needs.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReviewableOrder {
    pub id: Uuid,
    pub order_items: Vec<ReviewableItem>,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct ReviewableItem {
    /// Order item id to reference when submitting the review.
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderTracking {
    pub id: Uuid,
    pub status: crate::entity::orders::OrderStatus,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct TopSeller {
    pub id: Uuid,
    pub total_quantity: i64,
    pub name: String,
    pub images: Vec<String>,
    #[serde(with = "crate::money")]
    #[schema(value_type = f64)]
    pub price: i64,
    #[serde(default, with = "crate::money::option")]
    #[schema(value_type = Option<f64>)]
    pub oldprice: Option<i64>,
    pub visible: bool,
}

#[derive(Debug, Serialize, ToSchema, PartialEq)]
pub struct MonthlySales {
    /// First day of the month, `YYYY-MM-01`.
    pub month: String,
    pub order_count: i64,
}
