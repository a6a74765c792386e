use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "product_subcategories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub product_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub sub_category_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::products::Entity",
        from = "Column::ProductId",
        to = "super::products::Column::Id",
        on_delete = "Cascade"
    )]
    Products,
    #[sea_orm(
        belongs_to = "super::sub_categories::Entity",
        from = "Column::SubCategoryId",
        to = "super::sub_categories::Column::Id",
        on_delete = "Cascade"
    )]
    SubCategories,
}

impl ActiveModelBehavior for ActiveModel {}
