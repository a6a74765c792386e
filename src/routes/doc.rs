use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
            ResetPasswordRequest, UpdateProfileRequest,
        },
        catalog::{
            CatalogModelList, CatalogModelRequest, CategoryList, CategoryRequest,
            CreateSubCategoryRequest, SubCategoriesByCategoriesRequest, SubCategoryList,
            UpdateCatalogModelRequest, UpdateSubCategoryRequest,
        },
        inquiries::{
            CreateInquiryRequest, DeleteInquiriesRequest, InquiryList, UpdateInquiryReadRequest,
        },
        orders::{
            CreateOrderRequest, MonthlySales, OrderItemQuantityUpdated, OrderItemRequest,
            OrderList, OrderTracking, OrderWithItems, ReviewableItem, ReviewableOrder, TopSeller,
            UpdateOrderItemQuantityRequest, UpdateOrderStatusRequest,
        },
        products::{CreateProductRequest, PageInfo, ProductList, ProductPage, UpdateProductRequest},
        reviews::{CreateReviewRequest, ReviewList, UpdateReviewStatusRequest},
        users::{ChangePasswordRequest, UserList},
        widgets::{CreateWidgetRequest, DeleteWidgetsRequest, UpdateWidgetRequest, WidgetList, WidgetView},
    },
    entity::{
        inquiries::InquiryKind, orders::OrderStatus, reviews::ReviewStatus, users::Role,
        widgets::WidgetKind,
    },
    models::{
        CatalogModel, Category, Inquiry, Order, OrderItem, Product, ProductSummary, Review,
        SubCategory, User, Widget,
    },
    response::{ApiResponse, Meta},
    routes::{auth, catalog, health, inquiries, orders, params, products, reviews, users, widgets},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        health::readiness,
        auth::register,
        auth::login,
        auth::me,
        auth::update_me,
        auth::forgot_password,
        auth::reset_password,
        products::list_visible_products,
        products::filter_products,
        products::list_products,
        products::get_product,
        products::product_reviews,
        products::create_product,
        products::update_product,
        products::delete_product,
        catalog::list_categories,
        catalog::create_category,
        catalog::update_category,
        catalog::delete_category,
        catalog::list_sub_categories,
        catalog::sub_categories_by_categories,
        catalog::create_sub_category,
        catalog::update_sub_category,
        catalog::delete_sub_category,
        catalog::list_models,
        catalog::create_model,
        catalog::update_model,
        catalog::delete_model,
        orders::create_order,
        orders::list_my_orders,
        orders::list_all_orders,
        orders::list_client_orders,
        orders::top_sellers,
        orders::monthly_sales,
        orders::get_order,
        orders::update_order_status,
        orders::update_order_item_quantity,
        orders::get_order_for_review,
        orders::track_order,
        reviews::create_review,
        reviews::update_review_status,
        reviews::list_reviews,
        widgets::list_visible_widgets,
        widgets::list_widgets,
        widgets::get_widget,
        widgets::create_widget,
        widgets::update_widget,
        widgets::delete_widgets,
        inquiries::create_inquiry,
        inquiries::list_inquiries,
        inquiries::get_inquiry,
        inquiries::delete_inquiries,
        inquiries::set_inquiry_read,
        users::list_users,
        users::change_password
    ),
    components(
        schemas(
            User,
            Role,
            Category,
            SubCategory,
            CatalogModel,
            Product,
            ProductSummary,
            Order,
            OrderStatus,
            OrderItem,
            Review,
            ReviewStatus,
            Widget,
            WidgetKind,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            CategoryRequest,
            CreateSubCategoryRequest,
            UpdateSubCategoryRequest,
            SubCategoriesByCategoriesRequest,
            CatalogModelRequest,
            UpdateCatalogModelRequest,
            CategoryList,
            SubCategoryList,
            CatalogModelList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductList,
            ProductPage,
            PageInfo,
            OrderItemRequest,
            CreateOrderRequest,
            UpdateOrderStatusRequest,
            UpdateOrderItemQuantityRequest,
            OrderWithItems,
            OrderList,
            OrderItemQuantityUpdated,
            ReviewableOrder,
            ReviewableItem,
            OrderTracking,
            TopSeller,
            MonthlySales,
            CreateReviewRequest,
            UpdateReviewStatusRequest,
            ReviewList,
            CreateWidgetRequest,
            UpdateWidgetRequest,
            DeleteWidgetsRequest,
            WidgetList,
            WidgetView,
            Inquiry,
            InquiryKind,
            CreateInquiryRequest,
            DeleteInquiriesRequest,
            UpdateInquiryReadRequest,
            InquiryList,
            UserList,
            ChangePasswordRequest,
            params::Pagination,
            params::SortOrder,
            params::ProductFilterQuery,
            params::OrderListQuery,
            params::ReviewListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductPage>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<Review>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Products", description = "Storefront listings and product administration"),
        (name = "Catalog", description = "Categories, subcategories and product models"),
        (name = "Orders", description = "Order placement and lookup"),
        (name = "Admin", description = "Order administration and sales statistics"),
        (name = "Reviews", description = "Product reviews and moderation"),
        (name = "Widgets", description = "Curated storefront product lists"),
        (name = "Inquiries", description = "Contact messages and quote requests"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_core_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders",
            "/api/orders/items/{order_item_id}",
            "/api/orders/{id}/review",
            "/api/reviews/status",
            "/api/products/visible",
            "/api/products/filter",
            "/api/inquiries/{kind}",
            "/api/inquiries/{kind}/read",
            "/api/users",
            "/api/users/password",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
