use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::widgets::{
        CreateWidgetRequest, DeleteWidgetsRequest, UpdateWidgetRequest, WidgetList, WidgetView,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Widget,
    response::ApiResponse,
    services::widget_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(list_widgets).post(create_widget).delete(delete_widgets),
        )
        .route("/visible", get(list_visible_widgets))
        .route("/{id}", put(update_widget).get(get_widget))
}

#[utoipa::path(
    get,
    path = "/api/widgets/visible",
    responses((status = 200, description = "Visible widgets with their products, cached", body = ApiResponse<Vec<WidgetView>>)),
    tag = "Widgets"
)]
pub async fn list_visible_widgets(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Vec<WidgetView>>>> {
    let resp = state
        .timed(widget_service::list_visible_widgets(&state))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/widgets",
    responses((status = 200, description = "All widgets", body = ApiResponse<WidgetList>)),
    security(("bearer_auth" = [])),
    tag = "Widgets"
)]
pub async fn list_widgets(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WidgetList>>> {
    let resp = state
        .timed(widget_service::list_widgets(&state, &user))
        .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/widgets/{id}",
    params(("id" = Uuid, Path, description = "Widget ID")),
    responses(
        (status = 200, description = "Widget", body = ApiResponse<Widget>),
        (status = 404, description = "Widget not found")
    ),
    tag = "Widgets"
)]
pub async fn get_widget(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Widget>>> {
    let resp = state.timed(widget_service::get_widget(&state, id)).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/widgets",
    request_body = CreateWidgetRequest,
    responses(
        (status = 201, description = "Widget created", body = ApiResponse<Widget>),
        (status = 404, description = "One or more products not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Widgets"
)]
pub async fn create_widget(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateWidgetRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Widget>>)> {
    let resp = widget_service::create_widget(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/widgets/{id}",
    params(("id" = Uuid, Path, description = "Widget ID")),
    request_body = UpdateWidgetRequest,
    responses(
        (status = 200, description = "Widget updated", body = ApiResponse<Widget>),
        (status = 404, description = "Widget or product not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Widgets"
)]
pub async fn update_widget(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateWidgetRequest>,
) -> AppResult<Json<ApiResponse<Widget>>> {
    let resp = widget_service::update_widget(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/widgets",
    request_body = DeleteWidgetsRequest,
    responses(
        (status = 200, description = "Widgets deleted"),
        (status = 404, description = "None of the ids exist")
    ),
    security(("bearer_auth" = [])),
    tag = "Widgets"
)]
pub async fn delete_widgets(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<DeleteWidgetsRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = widget_service::delete_widgets(&state, &user, payload).await?;
    Ok(Json(resp))
}
