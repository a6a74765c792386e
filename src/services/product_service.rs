use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    cache::{cached, invalidate_catalog},
    dto::products::{CreateProductRequest, PageInfo, ProductList, ProductPage, UpdateProductRequest},
    entity::{
        catalog_models::Entity as CatalogModels,
        categories::{Column as CategoryCol, Entity as Categories},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        product_categories::{
            ActiveModel as ProductCategoryActive, Column as ProductCategoryCol,
            Entity as ProductCategories,
        },
        product_subcategories::{
            ActiveModel as ProductSubActive, Column as ProductSubCol, Entity as ProductSubcategories,
        },
        products::{ActiveModel, Column, Entity as Products, ImageList, Model as ProductModel},
        reviews::{Column as ReviewCol, Entity as Reviews},
        sub_categories::{Column as SubCategoryCol, Entity as SubCategories},
        widget_products::{Column as WidgetProductCol, Entity as WidgetProducts},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::{CatalogModel, Category, LISTING_IMAGE_LIMIT, Product, ProductSummary},
    response::{ApiResponse, Meta, total_pages},
    routes::params::{Pagination, ProductFilterQuery},
    services::{
        catalog_service::{distinct, resolve_taxonomy},
        order_service::recompute_order_total,
    },
    state::AppState,
};

const VISIBLE_PAGE_SIZE: i64 = 20;
const FILTER_PAGE_SIZE: i64 = 10;

/// Storefront listing of visible products, served through the catalog cache.
pub async fn list_visible_products(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductPage>> {
    let (page, limit, offset) = pagination.normalize_with_default(VISIBLE_PAGE_SIZE);
    let key = format!("catalog:visible:page={page}:limit={limit}");

    let data = cached(state.cache.as_ref(), state.cache_options(), &key, move || async move {
        let finder = Products::find().filter(Column::Visible.eq(true));
        listing_page(&state.orm, finder, page, limit, offset).await
    })
    .await?;

    Ok(ApiResponse::success("Visible products", data, None))
}

/// Visible products narrowed by category and/or subcategory name.
pub async fn get_products_by_filter(
    state: &AppState,
    query: ProductFilterQuery,
) -> AppResult<ApiResponse<ProductPage>> {
    let (page, limit, offset) = query.pagination().normalize_with_default(FILTER_PAGE_SIZE);
    let category = query.category.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let subcategory = query.subcategory.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let key = format!(
        "catalog:filter:category={}:subcategory={}:page={page}:limit={limit}",
        category.unwrap_or(""),
        subcategory.unwrap_or("")
    );

    let data = cached(state.cache.as_ref(), state.cache_options(), &key, move || async move {
        let mut finder = Products::find().filter(Column::Visible.eq(true));

        if let Some(name) = category {
            let found = Categories::find()
                .filter(CategoryCol::Name.eq(name))
                .one(&state.orm)
                .await?;
            let category = match found {
                Some(c) => c,
                None => return Err(AppError::not_found("Category")),
            };
            finder = finder.filter(
                Column::Id.in_subquery(
                    Query::select()
                        .column(ProductCategoryCol::ProductId)
                        .from(ProductCategories)
                        .and_where(Expr::col(ProductCategoryCol::CategoryId).eq(category.id))
                        .to_owned(),
                ),
            );
        }

        if let Some(name) = subcategory {
            let found = SubCategories::find()
                .filter(SubCategoryCol::Name.eq(name))
                .one(&state.orm)
                .await?;
            let sub = match found {
                Some(s) => s,
                None => return Err(AppError::not_found("Subcategory")),
            };
            finder = finder.filter(
                Column::Id.in_subquery(
                    Query::select()
                        .column(ProductSubCol::ProductId)
                        .from(ProductSubcategories)
                        .and_where(Expr::col(ProductSubCol::SubCategoryId).eq(sub.id))
                        .to_owned(),
                ),
            );
        }

        listing_page(&state.orm, finder, page, limit, offset).await
    })
    .await?;

    Ok(ApiResponse::success("Products", data, None))
}

/// Every product, hidden ones included.
pub async fn list_products(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Products::find()
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;
    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = product_details(&state.orm, products).await?;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let result = Products::find_by_id(id).one(&state.orm).await?;
    let result = match result {
        Some(p) => p,
        None => return Err(AppError::not_found("Product")),
    };
    let product = single_detail(&state.orm, result).await?;
    Ok(ApiResponse::success("Product", product, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    if payload.name.trim().is_empty()
        || payload.description.trim().is_empty()
        || payload.category_ids.is_empty()
    {
        return Err(AppError::BadRequest(
            "Name, description, model, price and at least one category are required".into(),
        ));
    }
    validate_money(payload.price, payload.oldprice)?;
    if payload.stock < 0 {
        return Err(AppError::BadRequest("Stock cannot be negative".into()));
    }

    let category_ids = distinct(&payload.category_ids);
    let sub_category_ids = distinct(&payload.sub_category_ids);

    let detail = state
        .timed(async {
            let txn = state.orm.begin().await?;
            if CatalogModels::find_by_id(payload.model_id).one(&txn).await?.is_none() {
                return Err(AppError::not_found("Model"));
            }
            resolve_taxonomy(&txn, &category_ids, &sub_category_ids).await?;

            let now = Utc::now();
            let product = ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(payload.name.trim().to_string()),
                description: Set(payload.description),
                price: Set(payload.price),
                oldprice: Set(payload.oldprice),
                stock: Set(payload.stock),
                visible: Set(payload.visible),
                stock_availability: Set(payload.stock_availability),
                average_rating: Set(0.0),
                images: Set(ImageList(payload.images)),
                options: Set(payload.options),
                model_id: Set(Some(payload.model_id)),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;
            replace_links(&txn, product.id, Some(&category_ids), Some(&sub_category_ids)).await?;
            let detail = single_detail(&txn, product).await?;
            txn.commit().await?;
            Ok::<_, AppError>(detail)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "product_create",
        "products",
        serde_json::json!({ "product_id": detail.id }),
    )
    .await;

    Ok(ApiResponse::success("Product created", detail, Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_staff(user)?;
    let detail = state
        .timed(async {
            let txn = state.orm.begin().await?;

            let existing = Products::find_by_id(id).one(&txn).await?;
            let existing = match existing {
                Some(p) => p,
                None => return Err(AppError::not_found("Product")),
            };

            validate_money(
                payload.price.unwrap_or(existing.price),
                payload.oldprice.or(existing.oldprice),
            )?;

            if let Some(model_id) = payload.model_id {
                if CatalogModels::find_by_id(model_id).one(&txn).await?.is_none() {
                    return Err(AppError::not_found("Model"));
                }
            }

            let new_categories = payload.category_ids.as_deref().map(distinct);
            let new_subs = payload.sub_category_ids.as_deref().map(distinct);
            if new_categories.as_ref().is_some_and(Vec::is_empty) {
                return Err(AppError::BadRequest("At least one category is required".into()));
            }
            if new_categories.is_some() || new_subs.is_some() {
                let category_ids = match &new_categories {
                    Some(ids) => ids.clone(),
                    None => linked_ids(&txn, id, LinkKind::Category).await?,
                };
                let sub_category_ids = match &new_subs {
                    Some(ids) => ids.clone(),
                    None => linked_ids(&txn, id, LinkKind::SubCategory).await?,
                };
                resolve_taxonomy(&txn, &category_ids, &sub_category_ids).await?;
            }

            let mut active: ActiveModel = existing.into();
            if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
                active.name = Set(name.trim().to_string());
            }
            if let Some(description) = payload.description {
                active.description = Set(description);
            }
            if let Some(price) = payload.price {
                active.price = Set(price);
            }
            if let Some(oldprice) = payload.oldprice {
                active.oldprice = Set(Some(oldprice));
            }
            if let Some(stock) = payload.stock {
                if stock < 0 {
                    return Err(AppError::BadRequest("Stock cannot be negative".into()));
                }
                active.stock = Set(stock);
            }
            if let Some(visible) = payload.visible {
                active.visible = Set(visible);
            }
            if let Some(available) = payload.stock_availability {
                active.stock_availability = Set(available);
            }
            if let Some(images) = payload.images {
                active.images = Set(ImageList(images));
            }
            if let Some(options) = payload.options {
                active.options = Set(Some(options));
            }
            if let Some(model_id) = payload.model_id {
                active.model_id = Set(Some(model_id));
            }
            active.updated_at = Set(Utc::now().into());
            let product = active.update(&txn).await?;

            replace_links(&txn, id, new_categories.as_deref(), new_subs.as_deref()).await?;
            let detail = single_detail(&txn, product).await?;
            txn.commit().await?;
            Ok::<_, AppError>(detail)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

/// Removes a product with its reviews, order lines and catalog links.
/// Orders that lose a line get their total recomputed in the same transaction.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let affected_orders = state
        .timed(async {
            let txn = state.orm.begin().await?;

            if Products::find_by_id(id).one(&txn).await?.is_none() {
                return Err(AppError::not_found("Product"));
            }

            Reviews::delete_many()
                .filter(ReviewCol::ProductId.eq(id))
                .exec(&txn)
                .await?;

            let affected_orders: HashSet<Uuid> = OrderItems::find()
                .filter(OrderItemCol::ProductId.eq(id))
                .all(&txn)
                .await?
                .into_iter()
                .map(|item| item.order_id)
                .collect();
            OrderItems::delete_many()
                .filter(OrderItemCol::ProductId.eq(id))
                .exec(&txn)
                .await?;
            for order_id in &affected_orders {
                recompute_order_total(&txn, *order_id).await?;
            }

            ProductCategories::delete_many()
                .filter(ProductCategoryCol::ProductId.eq(id))
                .exec(&txn)
                .await?;
            ProductSubcategories::delete_many()
                .filter(ProductSubCol::ProductId.eq(id))
                .exec(&txn)
                .await?;
            WidgetProducts::delete_many()
                .filter(WidgetProductCol::ProductId.eq(id))
                .exec(&txn)
                .await?;
            Products::delete_by_id(id).exec(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>(affected_orders)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id, "orders_recomputed": affected_orders.len() }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Listing rows for `products`, in the given order, with category and
/// subcategory names flattened and images cut to the listing limit.
pub async fn summarize<C: ConnectionTrait>(
    conn: &C,
    products: Vec<ProductModel>,
) -> AppResult<Vec<ProductSummary>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let (mut categories, mut subcategories) = taxonomy_for(conn, &ids).await?;

    Ok(products
        .into_iter()
        .map(|p| {
            let mut images = p.images.0;
            images.truncate(LISTING_IMAGE_LIMIT);
            ProductSummary {
                id: p.id,
                name: p.name,
                price: p.price,
                oldprice: p.oldprice,
                stock_availability: p.stock_availability,
                average_rating: p.average_rating,
                images,
                categories: names(categories.remove(&p.id)),
                subcategories: names(subcategories.remove(&p.id)),
            }
        })
        .collect())
}

async fn listing_page<C: ConnectionTrait>(
    conn: &C,
    finder: Select<Products>,
    page: i64,
    limit: i64,
    offset: i64,
) -> AppResult<ProductPage> {
    let finder = finder
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(conn).await? as i64;
    let rows = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(conn)
        .await?;

    Ok(ProductPage {
        products: summarize(conn, rows).await?,
        pagination: PageInfo {
            page,
            limit,
            total,
            total_pages: total_pages(total, limit),
        },
    })
}

async fn single_detail<C: ConnectionTrait>(conn: &C, product: ProductModel) -> AppResult<Product> {
    let mut details = product_details(conn, vec![product]).await?;
    match details.pop() {
        Some(detail) => Ok(detail),
        None => Err(AppError::not_found("Product")),
    }
}

async fn product_details<C: ConnectionTrait>(
    conn: &C,
    products: Vec<ProductModel>,
) -> AppResult<Vec<Product>> {
    let ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let (mut categories, mut subcategories) = taxonomy_for(conn, &ids).await?;

    let model_ids: HashSet<Uuid> = products.iter().filter_map(|p| p.model_id).collect();
    let models: HashMap<Uuid, CatalogModel> = if model_ids.is_empty() {
        HashMap::new()
    } else {
        CatalogModels::find()
            .filter(crate::entity::catalog_models::Column::Id.is_in(model_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|m| (m.id, CatalogModel::from(m)))
            .collect()
    };

    Ok(products
        .into_iter()
        .map(|p| Product {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price,
            oldprice: p.oldprice,
            stock: p.stock,
            visible: p.visible,
            stock_availability: p.stock_availability,
            average_rating: p.average_rating,
            images: p.images.0,
            options: p.options,
            model: p.model_id.and_then(|id| models.get(&id).cloned()),
            categories: sorted(categories.remove(&p.id)),
            subcategories: sorted(subcategories.remove(&p.id)),
            created_at: p.created_at.with_timezone(&Utc),
            updated_at: p.updated_at.with_timezone(&Utc),
        })
        .collect())
}

type Grouped = HashMap<Uuid, Vec<Category>>;

/// Categories and subcategories of each product, four queries in total.
async fn taxonomy_for<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> AppResult<(Grouped, Grouped)> {
    if ids.is_empty() {
        return Ok((HashMap::new(), HashMap::new()));
    }

    let category_links = ProductCategories::find()
        .filter(ProductCategoryCol::ProductId.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    let category_names: HashMap<Uuid, String> = Categories::find()
        .filter(CategoryCol::Id.is_in(category_links.iter().map(|l| l.category_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect();

    let sub_links = ProductSubcategories::find()
        .filter(ProductSubCol::ProductId.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    let sub_names: HashMap<Uuid, String> = SubCategories::find()
        .filter(SubCategoryCol::Id.is_in(sub_links.iter().map(|l| l.sub_category_id)))
        .all(conn)
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect();

    let mut categories: Grouped = HashMap::new();
    for link in category_links {
        if let Some(name) = category_names.get(&link.category_id) {
            categories.entry(link.product_id).or_default().push(Category {
                id: link.category_id,
                name: name.clone(),
            });
        }
    }
    let mut subcategories: Grouped = HashMap::new();
    for link in sub_links {
        if let Some(name) = sub_names.get(&link.sub_category_id) {
            subcategories.entry(link.product_id).or_default().push(Category {
                id: link.sub_category_id,
                name: name.clone(),
            });
        }
    }
    Ok((categories, subcategories))
}

fn sorted(group: Option<Vec<Category>>) -> Vec<Category> {
    let mut group = group.unwrap_or_default();
    group.sort_by(|a, b| a.name.cmp(&b.name));
    group
}

fn names(group: Option<Vec<Category>>) -> Vec<String> {
    sorted(group).into_iter().map(|c| c.name).collect()
}

enum LinkKind {
    Category,
    SubCategory,
}

async fn linked_ids<C: ConnectionTrait>(conn: &C, product_id: Uuid, kind: LinkKind) -> AppResult<Vec<Uuid>> {
    let ids = match kind {
        LinkKind::Category => ProductCategories::find()
            .filter(ProductCategoryCol::ProductId.eq(product_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| l.category_id)
            .collect(),
        LinkKind::SubCategory => ProductSubcategories::find()
            .filter(ProductSubCol::ProductId.eq(product_id))
            .all(conn)
            .await?
            .into_iter()
            .map(|l| l.sub_category_id)
            .collect(),
    };
    Ok(ids)
}

/// Swap the join rows that were supplied; `None` leaves that side untouched.
async fn replace_links<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    category_ids: Option<&[Uuid]>,
    sub_category_ids: Option<&[Uuid]>,
) -> AppResult<()> {
    if let Some(category_ids) = category_ids {
        ProductCategories::delete_many()
            .filter(ProductCategoryCol::ProductId.eq(product_id))
            .exec(conn)
            .await?;
        if !category_ids.is_empty() {
            let rows = category_ids.iter().map(|category_id| ProductCategoryActive {
                product_id: Set(product_id),
                category_id: Set(*category_id),
            });
            ProductCategories::insert_many(rows).exec(conn).await?;
        }
    }

    if let Some(sub_category_ids) = sub_category_ids {
        ProductSubcategories::delete_many()
            .filter(ProductSubCol::ProductId.eq(product_id))
            .exec(conn)
            .await?;
        if !sub_category_ids.is_empty() {
            let rows = sub_category_ids.iter().map(|sub_category_id| ProductSubActive {
                product_id: Set(product_id),
                sub_category_id: Set(*sub_category_id),
            });
            ProductSubcategories::insert_many(rows).exec(conn).await?;
        }
    }
    Ok(())
}

fn validate_money(price: i64, oldprice: Option<i64>) -> AppResult<()> {
    if price <= 0 {
        return Err(AppError::BadRequest("Price must be positive".into()));
    }
    if oldprice.is_some_and(|p| p < 0) {
        return Err(AppError::BadRequest("Old price cannot be negative".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_rules() {
        assert!(validate_money(1000, None).is_ok());
        assert!(validate_money(1000, Some(1500)).is_ok());
        assert!(validate_money(0, None).is_err());
        assert!(validate_money(1000, Some(-1)).is_err());
    }

    #[test]
    fn names_are_sorted_and_flattened() {
        let group = vec![
            Category { id: Uuid::new_v4(), name: "Shoes".into() },
            Category { id: Uuid::new_v4(), name: "Bags".into() },
        ];
        assert_eq!(names(Some(group)), vec!["Bags".to_string(), "Shoes".to_string()]);
        assert!(names(None).is_empty());
    }
}
