use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    entity::widgets::WidgetKind,
    models::{ProductSummary, Widget},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateWidgetRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub visible: bool,
    pub product_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateWidgetRequest {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<WidgetKind>,
    pub visible: Option<bool>,
    pub product_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteWidgetsRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct WidgetList {
    #[schema(value_type = Vec<Widget>)]
    pub items: Vec<Widget>,
}

/// Storefront rendering of a visible widget.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct WidgetView {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: WidgetKind,
    pub products: Vec<ProductSummary>,
}
