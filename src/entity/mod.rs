pub mod audit_logs;
pub mod catalog_models;
pub mod categories;
pub mod inquiries;
pub mod order_items;
pub mod orders;
pub mod product_categories;
pub mod product_subcategories;
pub mod products;
pub mod reviews;
pub mod sub_categories;
pub mod sub_category_categories;
pub mod users;
pub mod widget_products;
pub mod widgets;

pub use audit_logs::Entity as AuditLogs;
pub use catalog_models::Entity as CatalogModels;
pub use categories::Entity as Categories;
pub use inquiries::Entity as Inquiries;
pub use order_items::Entity as OrderItems;
pub use orders::Entity as Orders;
pub use product_categories::Entity as ProductCategories;
pub use product_subcategories::Entity as ProductSubcategories;
pub use products::Entity as Products;
pub use reviews::Entity as Reviews;
pub use sub_categories::Entity as SubCategories;
pub use sub_category_categories::Entity as SubCategoryCategories;
pub use users::Entity as Users;
pub use widget_products::Entity as WidgetProducts;
pub use widgets::Entity as Widgets;
