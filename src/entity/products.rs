use sea_orm::FromJsonQueryResult;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Ordered image URLs, stored as a JSON array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct ImageList(pub Vec<String>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: String,
    /// Unit price in cents.
    pub price: i64,
    pub oldprice: Option<i64>,
    pub stock: i32,
    pub visible: bool,
    pub stock_availability: bool,
    #[sea_orm(column_type = "Double")]
    pub average_rating: f64,
    #[sea_orm(column_type = "Json")]
    pub images: ImageList,
    pub options: Option<String>,
    pub model_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::catalog_models::Entity",
        from = "Column::ModelId",
        to = "super::catalog_models::Column::Id"
    )]
    CatalogModels,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::reviews::Entity")]
    Reviews,
}

impl Related<super::catalog_models::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CatalogModels.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::reviews::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reviews.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
