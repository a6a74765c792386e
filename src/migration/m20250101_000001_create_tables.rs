use sea_orm::{EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::entity::{
    AuditLogs, CatalogModels, Categories, Inquiries, OrderItems, Orders, ProductCategories,
    ProductSubcategories, Products, Reviews, SubCategories, SubCategoryCategories, Users,
    WidgetProducts, Widgets, inquiries, order_items, orders, reviews,
};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create<E: EntityTrait>(manager: &SchemaManager<'_>, schema: &Schema, entity: E) -> Result<(), DbErr> {
    manager
        .create_table(schema.create_table_from_entity(entity).if_not_exists().to_owned())
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Referenced tables first.
        create(manager, &schema, Users).await?;
        create(manager, &schema, Categories).await?;
        create(manager, &schema, SubCategories).await?;
        create(manager, &schema, SubCategoryCategories).await?;
        create(manager, &schema, CatalogModels).await?;
        create(manager, &schema, Products).await?;
        create(manager, &schema, ProductCategories).await?;
        create(manager, &schema, ProductSubcategories).await?;
        create(manager, &schema, Orders).await?;
        create(manager, &schema, OrderItems).await?;
        create(manager, &schema, Reviews).await?;
        create(manager, &schema, Widgets).await?;
        create(manager, &schema, WidgetProducts).await?;
        create(manager, &schema, Inquiries).await?;
        create(manager, &schema, AuditLogs).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_user_order_item")
                    .table(Reviews)
                    .col(reviews::Column::UserId)
                    .col(reviews::Column::OrderItemId)
                    .unique()
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_reviews_product_status")
                    .table(Reviews)
                    .col(reviews::Column::ProductId)
                    .col(reviews::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user")
                    .table(Orders)
                    .col(orders::Column::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order")
                    .table(OrderItems)
                    .col(order_items::Column::OrderId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_inquiries_kind_created")
                    .table(Inquiries)
                    .col(inquiries::Column::Kind)
                    .col(inquiries::Column::CreatedAt)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager.drop_table(Table::drop().table(AuditLogs).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Inquiries).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(WidgetProducts).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Widgets).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Reviews).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(OrderItems).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Orders).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(ProductSubcategories).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(ProductCategories).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Products).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(CatalogModels).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(SubCategoryCategories).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(SubCategories).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Categories).if_exists().to_owned()).await?;
        manager.drop_table(Table::drop().table(Users).if_exists().to_owned()).await?;
        Ok(())
    }
}
