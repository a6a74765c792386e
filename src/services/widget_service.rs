use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    cache::{cached, invalidate_catalog},
    dto::widgets::{
        CreateWidgetRequest, DeleteWidgetsRequest, UpdateWidgetRequest, WidgetList, WidgetView,
    },
    entity::{
        products::{Column as ProdCol, Entity as Products},
        widget_products::{
            ActiveModel as WidgetProductActive, Column as WidgetProductCol, Entity as WidgetProducts,
        },
        widgets::{ActiveModel as WidgetActive, Column as WidgetCol, Entity as Widgets, Model as WidgetModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Widget,
    response::{ApiResponse, Meta},
    services::{catalog_service::distinct, product_service::summarize},
    state::AppState,
};

const VISIBLE_WIDGETS_KEY: &str = "catalog:widgets:visible";

pub async fn create_widget(
    state: &AppState,
    user: &AuthUser,
    payload: CreateWidgetRequest,
) -> AppResult<ApiResponse<Widget>> {
    ensure_staff(user)?;
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Invalid input data".into()));
    }
    let product_ids = distinct(&payload.product_ids);

    let widget = state
        .timed(async {
            let txn = state.orm.begin().await?;
            ensure_products_exist(&txn, &product_ids).await?;

            let widget = WidgetActive {
                id: Set(Uuid::new_v4()),
                name: Set(name),
                kind: Set(payload.kind),
                visible: Set(payload.visible),
                created_at: Set(Utc::now().into()),
            }
            .insert(&txn)
            .await?;
            attach_products(&txn, widget.id, &product_ids).await?;
            txn.commit().await?;
            Ok::<_, AppError>(widget)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "widget_create",
        "widgets",
        serde_json::json!({ "widget_id": widget.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Widget created",
        widget_view(widget, product_ids),
        Some(Meta::empty()),
    ))
}

pub async fn list_widgets(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<WidgetList>> {
    ensure_staff(user)?;
    let widgets = Widgets::find()
        .order_by_asc(WidgetCol::CreatedAt)
        .all(&state.orm)
        .await?;
    let mut members = members_of(&state.orm, widgets.iter().map(|w| w.id)).await?;

    let items = widgets
        .into_iter()
        .map(|w| {
            let ids = members.remove(&w.id).unwrap_or_default();
            widget_view(w, ids)
        })
        .collect();
    Ok(ApiResponse::success("Widgets", WidgetList { items }, None))
}

pub async fn get_widget(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Widget>> {
    let widget = Widgets::find_by_id(id).one(&state.orm).await?;
    let widget = match widget {
        Some(w) => w,
        None => return Err(AppError::not_found("Widget")),
    };
    let mut members = members_of(&state.orm, [widget.id]).await?;
    let ids = members.remove(&widget.id).unwrap_or_default();
    Ok(ApiResponse::success("Widget", widget_view(widget, ids), None))
}

pub async fn update_widget(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateWidgetRequest,
) -> AppResult<ApiResponse<Widget>> {
    ensure_staff(user)?;
    if payload.name.is_none()
        && payload.kind.is_none()
        && payload.visible.is_none()
        && payload.product_ids.is_none()
    {
        return Err(AppError::BadRequest("Invalid input data".into()));
    }

    let (widget, mut members) = state
        .timed(async {
            let txn = state.orm.begin().await?;
            let existing = Widgets::find_by_id(id).one(&txn).await?;
            let existing = match existing {
                Some(w) => w,
                None => return Err(AppError::not_found("Widget")),
            };

            let mut active: WidgetActive = existing.into();
            if let Some(name) = payload.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()) {
                active.name = Set(name);
            }
            if let Some(kind) = payload.kind {
                active.kind = Set(kind);
            }
            if let Some(visible) = payload.visible {
                active.visible = Set(visible);
            }
            let widget = active.update(&txn).await?;

            if let Some(product_ids) = payload.product_ids {
                let product_ids = distinct(&product_ids);
                ensure_products_exist(&txn, &product_ids).await?;
                WidgetProducts::delete_many()
                    .filter(WidgetProductCol::WidgetId.eq(id))
                    .exec(&txn)
                    .await?;
                attach_products(&txn, id, &product_ids).await?;
            }
            let members = members_of(&txn, [id]).await?;
            txn.commit().await?;
            Ok::<_, AppError>((widget, members))
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;

    let ids = members.remove(&id).unwrap_or_default();
    Ok(ApiResponse::success("Updated", widget_view(widget, ids), Some(Meta::empty())))
}

pub async fn delete_widgets(
    state: &AppState,
    user: &AuthUser,
    payload: DeleteWidgetsRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let ids = distinct(&payload.ids);
    if ids.is_empty() {
        return Err(AppError::BadRequest("No widget IDs provided".into()));
    }

    let result = state
        .timed(async {
            let txn = state.orm.begin().await?;
            WidgetProducts::delete_many()
                .filter(WidgetProductCol::WidgetId.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
            let result = Widgets::delete_many()
                .filter(WidgetCol::Id.is_in(ids.iter().copied()))
                .exec(&txn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::NotFound(
                    "No widgets found with the provided IDs".into(),
                ));
            }
            txn.commit().await?;
            Ok::<_, AppError>(result)
        })
        .await?;

    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "widget_delete",
        "widgets",
        serde_json::json!({ "widget_ids": ids }),
    )
    .await;

    Ok(ApiResponse::success(
        "Widgets deleted",
        serde_json::json!({ "ids": ids, "deleted": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

/// Visible widgets with their visible products in curated order, cached.
pub async fn list_visible_widgets(state: &AppState) -> AppResult<ApiResponse<Vec<WidgetView>>> {
    let data = cached(
        state.cache.as_ref(),
        state.cache_options(),
        VISIBLE_WIDGETS_KEY,
        move || async move {
            let widgets = Widgets::find()
                .filter(WidgetCol::Visible.eq(true))
                .order_by_asc(WidgetCol::CreatedAt)
                .all(&state.orm)
                .await?;
            let members = members_of(&state.orm, widgets.iter().map(|w| w.id)).await?;

            let wanted: HashSet<Uuid> = members.values().flatten().copied().collect();
            let products = if wanted.is_empty() {
                Vec::new()
            } else {
                Products::find()
                    .filter(ProdCol::Id.is_in(wanted))
                    .filter(ProdCol::Visible.eq(true))
                    .all(&state.orm)
                    .await?
            };
            let summaries: HashMap<Uuid, _> = summarize(&state.orm, products)
                .await?
                .into_iter()
                .map(|s| (s.id, s))
                .collect();

            Ok(widgets
                .into_iter()
                .map(|w| {
                    let products = members
                        .get(&w.id)
                        .map(|ids| ids.iter().filter_map(|id| summaries.get(id).cloned()).collect::<Vec<_>>())
                        .unwrap_or_default();
                    WidgetView {
                        id: w.id,
                        name: w.name,
                        kind: w.kind,
                        products,
                    }
                })
                .collect::<Vec<_>>())
        },
    )
    .await?;

    Ok(ApiResponse::success("Widgets", data, None))
}

fn widget_view(model: WidgetModel, product_ids: Vec<Uuid>) -> Widget {
    Widget {
        id: model.id,
        name: model.name,
        kind: model.kind,
        visible: model.visible,
        product_ids,
    }
}

/// Product ids per widget, in position order.
async fn members_of<C, I>(conn: &C, widget_ids: I) -> AppResult<HashMap<Uuid, Vec<Uuid>>>
where
    C: ConnectionTrait,
    I: IntoIterator<Item = Uuid>,
{
    let rows = WidgetProducts::find()
        .filter(WidgetProductCol::WidgetId.is_in(widget_ids))
        .order_by_asc(WidgetProductCol::Position)
        .all(conn)
        .await?;

    let mut members: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for row in rows {
        members.entry(row.widget_id).or_default().push(row.product_id);
    }
    Ok(members)
}

async fn ensure_products_exist<C: ConnectionTrait>(conn: &C, ids: &[Uuid]) -> AppResult<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let found = Products::find()
        .filter(ProdCol::Id.is_in(ids.iter().copied()))
        .all(conn)
        .await?;
    if found.len() != ids.len() {
        return Err(AppError::NotFound("One or more products not found".into()));
    }
    Ok(())
}

async fn attach_products<C: ConnectionTrait>(conn: &C, widget_id: Uuid, product_ids: &[Uuid]) -> AppResult<()> {
    if product_ids.is_empty() {
        return Ok(());
    }
    let rows = product_ids
        .iter()
        .enumerate()
        .map(|(position, product_id)| WidgetProductActive {
            widget_id: Set(widget_id),
            product_id: Set(*product_id),
            position: Set(position as i32),
        });
    WidgetProducts::insert_many(rows).exec(conn).await?;
    Ok(())
}
