use sea_orm::entity::prelude::*;

/// Parent categories of a subcategory.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sub_category_categories")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub sub_category_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub category_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sub_categories::Entity",
        from = "Column::SubCategoryId",
        to = "super::sub_categories::Column::Id",
        on_delete = "Cascade"
    )]
    SubCategories,
    #[sea_orm(
        belongs_to = "super::categories::Entity",
        from = "Column::CategoryId",
        to = "super::categories::Column::Id",
        on_delete = "Cascade"
    )]
    Categories,
}

impl ActiveModelBehavior for ActiveModel {}
