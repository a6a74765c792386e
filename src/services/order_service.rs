use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    dto::orders::{
        CreateOrderRequest, OrderItemQuantityUpdated, OrderList, OrderTracking, OrderWithItems,
        ReviewableItem, ReviewableOrder, UpdateOrderItemQuantityRequest, UpdateOrderStatusRequest,
    },
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, OrderStatus},
        products::{Column as ProdCol, Entity as Products},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_client, ensure_staff},
    models::{Order, OrderItem},
    notify::{Notification, dispatch},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Accepts the lowercase status names, case-insensitively.
pub fn parse_order_status(raw: &str) -> AppResult<OrderStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(OrderStatus::Pending),
        "processing" => Ok(OrderStatus::Processing),
        "shipped" => Ok(OrderStatus::Shipped),
        "completed" => Ok(OrderStatus::Completed),
        "cancelled" => Ok(OrderStatus::Cancelled),
        other => Err(AppError::BadRequest(format!("Invalid order status: {other}"))),
    }
}

/// Sum of `price * quantity`, failing on overflow instead of wrapping.
pub fn order_total<I>(lines: I) -> AppResult<i64>
where
    I: IntoIterator<Item = (i64, i32)>,
{
    lines.into_iter().try_fold(0i64, |acc, (price, quantity)| {
        price
            .checked_mul(i64::from(quantity))
            .and_then(|line| acc.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Order total out of range".into()))
    })
}

/// Re-sum an order from its current lines and store the result.
/// The order row is locked first so concurrent line edits serialize.
pub async fn recompute_order_total<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<i64> {
    lock_order(conn, order_id).await?;
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .all(conn)
        .await?;
    let total = order_total(items.iter().map(|i| (i.price, i.quantity)))?;

    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    Orders::update_many()
        .col_expr(OrderCol::Total, Expr::value(total))
        .col_expr(OrderCol::UpdatedAt, Expr::value(now))
        .filter(OrderCol::Id.eq(order_id))
        .exec(conn)
        .await?;
    Ok(total)
}

/// Places an order at current catalog prices. The client total is only compared, never stored.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_client(user)?;
    if payload.order_items.is_empty() {
        return Err(AppError::BadRequest("Order must contain at least one item".into()));
    }
    if payload.order_items.iter().any(|i| i.quantity <= 0) {
        return Err(AppError::BadRequest("Quantity must be greater than zero".into()));
    }
    let payment_mode = payload.paymentmode.trim().to_string();
    if payment_mode.is_empty() {
        return Err(AppError::BadRequest("Payment mode is required".into()));
    }

    let (owner, order, items) = state
        .timed(async {
            let txn = state.orm.begin().await?;

            let owner = Users::find_by_id(user.user_id).one(&txn).await?;
            let owner = match owner {
                Some(u) => u,
                None => return Err(AppError::not_found("User")),
            };

            let wanted: HashSet<Uuid> = payload.order_items.iter().map(|i| i.product).collect();
            let products: HashMap<Uuid, _> = Products::find()
                .filter(ProdCol::Id.is_in(wanted.iter().copied()))
                .all(&txn)
                .await?
                .into_iter()
                .map(|p| (p.id, p))
                .collect();
            for line in &payload.order_items {
                if !products.contains_key(&line.product) {
                    return Err(AppError::BadRequest(format!(
                        "Product with id {} not found",
                        line.product
                    )));
                }
            }

            let total = order_total(
                payload
                    .order_items
                    .iter()
                    .filter_map(|line| products.get(&line.product).map(|p| (p.price, line.quantity))),
            )?;
            if let Some(claimed) = payload.total.filter(|claimed| *claimed != total) {
                tracing::warn!(
                    user_id = %user.user_id,
                    claimed,
                    computed = total,
                    "client total differs from computed total"
                );
            }

            let now = Utc::now();
            let order = OrderActive {
                id: Set(Uuid::new_v4()),
                user_id: Set(owner.id),
                total: Set(total),
                status: Set(OrderStatus::Pending),
                payment_mode: Set(payment_mode),
                address: Set(payload.address.or_else(|| owner.address.clone())),
                city: Set(payload.city.or_else(|| owner.city.clone())),
                zip_code: Set(payload.zip_code.or_else(|| owner.zip_code.clone())),
                country: Set(payload.country.or_else(|| owner.country.clone())),
                comment: Set(payload.comment),
                created_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?;

            let mut items = Vec::with_capacity(payload.order_items.len());
            for line in payload.order_items {
                let Some(product) = products.get(&line.product) else {
                    continue;
                };
                let item = OrderItemActive {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order.id),
                    product_id: Set(product.id),
                    quantity: Set(line.quantity),
                    price: Set(product.price),
                    image: Set(line.image.or_else(|| product.images.0.first().cloned())),
                    created_at: Set(now.into()),
                }
                .insert(&txn)
                .await?;
                items.push(OrderItem::from(item));
            }

            txn.commit().await?;
            Ok::<_, AppError>((owner, order, items))
        })
        .await?;

    tracing::info!(order_id = %order.id, total = order.total, items = items.len(), "order placed");
    if let Some(contact) = owner.contact() {
        dispatch(
            state.notifier.clone(),
            Notification::order_confirmation(contact, order.id),
        );
    }
    audit_quietly(
        state,
        Some(user.user_id),
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_staff(user)?;
    let status = parse_order_status(&payload.status)?;

    let (previous, order) = state
        .timed(async {
            let txn = state.orm.begin().await?;
            let existing = lock_order(&txn, id).await?;
            let previous = existing.status;

            let mut active: OrderActive = existing.into();
            active.status = Set(status);
            active.updated_at = Set(Utc::now().into());
            let order = active.update(&txn).await?;
            txn.commit().await?;
            Ok::<_, AppError>((previous, order))
        })
        .await?;

    tracing::info!(order_id = %order.id, from = ?previous, to = ?status, "order status changed");

    if status == OrderStatus::Completed && previous != OrderStatus::Completed {
        let owner = state
            .timed(async { Users::find_by_id(order.user_id).one(&state.orm).await.map_err(AppError::from) })
            .await;
        match owner {
            Ok(Some(owner)) => {
                if let Some(contact) = owner.contact() {
                    dispatch(
                        state.notifier.clone(),
                        Notification::review_request(
                            contact,
                            order.id,
                            &state.config.review_url_base,
                        ),
                    );
                }
            }
            Ok(None) => tracing::warn!(order_id = %order.id, "order owner missing, review request skipped"),
            Err(err) => tracing::warn!(error = %err, "review request lookup failed"),
        }
    }

    audit_quietly(
        state,
        Some(user.user_id),
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": status }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", Order::from(order), Some(Meta::empty())))
}

/// Changes one line's quantity; the price snapshot stays, the order total is re-summed.
pub async fn update_order_item_quantity(
    state: &AppState,
    user: &AuthUser,
    order_item_id: Uuid,
    payload: UpdateOrderItemQuantityRequest,
) -> AppResult<ApiResponse<OrderItemQuantityUpdated>> {
    ensure_staff(user)?;
    if payload.quantity <= 0 {
        return Err(AppError::BadRequest("Quantity must be greater than zero".into()));
    }

    let (item, total) = state
        .timed(async {
            let txn = state.orm.begin().await?;

            let item = OrderItems::find_by_id(order_item_id).one(&txn).await?;
            let item = match item {
                Some(i) => i,
                None => return Err(AppError::not_found("Order item")),
            };
            if Products::find_by_id(item.product_id).one(&txn).await?.is_none() {
                return Err(AppError::NotFound(format!(
                    "Product with id {} not found",
                    item.product_id
                )));
            }
            let order = lock_order(&txn, item.order_id).await?;

            let mut active: OrderItemActive = item.into();
            active.quantity = Set(payload.quantity);
            let item = active.update(&txn).await?;
            let total = recompute_order_total(&txn, order.id).await?;
            txn.commit().await?;
            Ok::<_, AppError>((item, total))
        })
        .await?;

    audit_quietly(
        state,
        Some(user.user_id),
        "order_item_quantity_update",
        "order_items",
        serde_json::json!({ "order_item_id": item.id, "quantity": item.quantity, "total": total }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order item quantity updated",
        OrderItemQuantityUpdated {
            order_item: OrderItem::from(item),
            total,
        },
        Some(Meta::empty()),
    ))
}

/// The owner's completed order, reduced to one entry per distinct product.
pub async fn get_order_for_review(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ReviewableOrder>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::not_found("Order")),
    };
    if order.user_id != user.user_id {
        return Err(AppError::Forbidden(
            "You can only access your own orders".into(),
        ));
    }
    if order.status != OrderStatus::Completed {
        return Err(AppError::Forbidden("Order is not completed yet".into()));
    }

    let items = order_lines(&state.orm, order.id).await?;
    let products: HashMap<Uuid, _> = Products::find()
        .filter(ProdCol::Id.is_in(items.iter().map(|i| i.product_id)))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let order_items = reviewable_items(items, |product_id| {
        products
            .get(&product_id)
            .map(|p| (p.name.clone(), p.images.0.first().cloned()))
    });

    Ok(ApiResponse::success(
        "Order",
        ReviewableOrder {
            id: order.id,
            order_items,
        },
        None,
    ))
}

/// An order with its lines; owners see their own, staff see any.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::not_found("Order")),
    };
    if order.user_id != user.user_id && !user.is_staff() {
        return Err(AppError::Forbidden(
            "You can only access your own orders".into(),
        ));
    }

    let items = order_lines(&state.orm, order.id)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from(order),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_client(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Public status lookup by order id.
pub async fn track_order(state: &AppState, id: Uuid) -> AppResult<ApiResponse<OrderTracking>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    match order {
        Some(o) => Ok(ApiResponse::success(
            "Order status",
            OrderTracking {
                id: o.id,
                status: o.status,
            },
            None,
        )),
        None => Err(AppError::not_found("Order")),
    }
}

async fn lock_order<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<crate::entity::orders::Model> {
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?;
    match order {
        Some(o) => Ok(o),
        None => Err(AppError::not_found("Order")),
    }
}

async fn order_lines<C: ConnectionTrait>(conn: &C, order_id: Uuid) -> AppResult<Vec<OrderItemModel>> {
    Ok(OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order_id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?)
}

/// First line per product wins; lines whose product is gone are dropped.
fn reviewable_items<F>(items: Vec<OrderItemModel>, product: F) -> Vec<ReviewableItem>
where
    F: Fn(Uuid) -> Option<(String, Option<String>)>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.product_id))
        .filter_map(|item| {
            let (name, image) = product(item.product_id)?;
            Some(ReviewableItem {
                id: item.id,
                product_id: item.product_id,
                name,
                image: image.or(item.image),
            })
        })
        .collect()
}
