use std::collections::{BTreeMap, HashMap};

use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Alias, Expr};
use sea_orm::{
    ColumnTrait, Condition, EntityTrait, FromQueryResult, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{MonthlySales, OrderList, TopSeller},
        users::UserList,
    },
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders},
        products::{Column as ProdCol, Entity as Products},
        users::{Column as UserCol, Entity as Users},
    },
    error::AppResult,
    middleware::auth::{AuthUser, ensure_staff},
    models::{LISTING_IMAGE_LIMIT, Order, User},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::order_service::parse_order_status,
    state::AppState,
};

const TOP_SELLER_COUNT: u64 = 5;

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        condition = condition.add(OrderCol::Status.eq(parse_order_status(status)?));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);

    Ok(ApiResponse::success("Orders", OrderList { items: orders }, Some(meta)))
}

/// Every account, newest first. Password material never leaves the entity.
pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<UserList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Users::find()
        .order_by_desc(UserCol::CreatedAt)
        .order_by_asc(UserCol::Id);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success("Users", UserList { items }, Some(Meta::new(page, limit, total))))
}

/// The five products with the most units ordered.
pub async fn top_sellers(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Vec<TopSeller>>> {
    ensure_staff(user)?;

    #[derive(Debug, FromQueryResult)]
    struct SoldRow {
        product_id: Uuid,
        total_quantity: i64,
    }

    let sold = OrderItems::find()
        .select_only()
        .column(OrderItemCol::ProductId)
        .column_as(Expr::col(OrderItemCol::Quantity).sum().cast_as(Alias::new("bigint")), "total_quantity")
        .group_by(OrderItemCol::ProductId)
        .order_by_desc(Expr::col(Alias::new("total_quantity")))
        .order_by_asc(OrderItemCol::ProductId)
        .limit(TOP_SELLER_COUNT)
        .into_model::<SoldRow>()
        .all(&state.orm)
        .await?;

    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(sold.iter().map(|s| s.product_id)))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let data = sold
        .into_iter()
        .filter_map(|row| {
            let product = products.get(&row.product_id)?;
            let mut images = product.images.0.clone();
            images.truncate(LISTING_IMAGE_LIMIT);
            Some(TopSeller {
                id: row.product_id,
                total_quantity: row.total_quantity,
                name: product.name.clone(),
                images,
                price: product.price,
                oldprice: product.oldprice,
                visible: product.visible,
            })
        })
        .collect();

    Ok(ApiResponse::success("Top sellers", data, None))
}

/// Order counts per calendar month, oldest first.
pub async fn monthly_sales(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Vec<MonthlySales>>> {
    ensure_staff(user)?;

    let placed: Vec<DateTimeWithTimeZone> = Orders::find()
        .select_only()
        .column(OrderCol::CreatedAt)
        .into_tuple()
        .all(&state.orm)
        .await?;

    Ok(ApiResponse::success("Monthly sales", bucket_by_month(&placed), None))
}

fn bucket_by_month(placed: &[DateTimeWithTimeZone]) -> Vec<MonthlySales> {
    let mut counts: BTreeMap<String, i64> = BTreeMap::new();
    for at in placed {
        *counts.entry(at.format("%Y-%m-01").to_string()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(month, order_count)| MonthlySales { month, order_count })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;

    #[test]
    fn months_are_grouped_and_ordered() {
        let tz = FixedOffset::east_opt(0).unwrap();
        let placed = vec![
            tz.with_ymd_and_hms(2025, 3, 14, 10, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2025, 1, 2, 9, 0, 0).unwrap(),
            tz.with_ymd_and_hms(2025, 3, 30, 23, 0, 0).unwrap(),
        ];

        let stats = bucket_by_month(&placed);
        assert_eq!(
            stats,
            vec![
                MonthlySales { month: "2025-01-01".into(), order_count: 1 },
                MonthlySales { month: "2025-03-01".into(), order_count: 2 },
            ]
        );
    }
}
