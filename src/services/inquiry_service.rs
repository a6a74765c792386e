use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    dto::inquiries::{
        CreateInquiryRequest, DeleteInquiriesRequest, InquiryList, UpdateInquiryReadRequest,
    },
    entity::inquiries::{ActiveModel, Column, Entity as Inquiries, InquiryKind},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_staff},
    models::Inquiry,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::auth_service::looks_like_email,
    state::AppState,
};

fn label(kind: InquiryKind) -> &'static str {
    match kind {
        InquiryKind::Contact => "Contact message",
        InquiryKind::Quote => "Quote request",
    }
}

fn required(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// Public form submission; lands unread.
pub async fn create_inquiry(
    state: &AppState,
    kind: InquiryKind,
    payload: CreateInquiryRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    let (Some(name), Some(email), Some(phonenumber), Some(message)) = (
        required(&payload.name),
        required(&payload.email),
        required(&payload.phonenumber),
        required(&payload.message),
    ) else {
        return Err(AppError::BadRequest("All fields are required".into()));
    };
    if !looks_like_email(&email) {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }
    let company = match kind {
        InquiryKind::Quote => payload.company.as_deref().and_then(required),
        InquiryKind::Contact => None,
    };

    let inquiry = state
        .timed(async {
            let inquiry = ActiveModel {
                id: Set(Uuid::new_v4()),
                kind: Set(kind),
                name: Set(name),
                company: Set(company),
                email: Set(email),
                phonenumber: Set(phonenumber),
                message: Set(message),
                read: Set(false),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            Ok::<_, AppError>(inquiry)
        })
        .await?;

    tracing::info!(inquiry_id = %inquiry.id, kind = ?kind, "inquiry received");
    audit_quietly(
        state,
        None,
        "inquiry_create",
        "inquiries",
        serde_json::json!({ "inquiry_id": inquiry.id, "kind": kind }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} received", label(kind)),
        Inquiry::from(inquiry),
        Some(Meta::empty()),
    ))
}

/// Newest first.
pub async fn list_inquiries(
    state: &AppState,
    user: &AuthUser,
    kind: InquiryKind,
    pagination: Pagination,
) -> AppResult<ApiResponse<InquiryList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = pagination.normalize();

    let finder = Inquiries::find()
        .filter(Column::Kind.eq(kind))
        .order_by_desc(Column::CreatedAt)
        .order_by_asc(Column::Id);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Inquiry::from)
        .collect();

    Ok(ApiResponse::success(
        label(kind),
        InquiryList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_inquiry(
    state: &AppState,
    user: &AuthUser,
    kind: InquiryKind,
    id: Uuid,
) -> AppResult<ApiResponse<Inquiry>> {
    ensure_staff(user)?;
    let found = Inquiries::find_by_id(id)
        .filter(Column::Kind.eq(kind))
        .one(&state.orm)
        .await?;
    match found {
        Some(inquiry) => Ok(ApiResponse::success(label(kind), Inquiry::from(inquiry), None)),
        None => Err(AppError::not_found(label(kind))),
    }
}

/// Deletes every listed inquiry of `kind`; ids of the other kind are left alone.
pub async fn delete_inquiries(
    state: &AppState,
    user: &AuthUser,
    kind: InquiryKind,
    payload: DeleteInquiriesRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_staff(user)?;
    let mut ids = payload.ids;
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() {
        return Err(AppError::BadRequest("No ids provided".into()));
    }

    let result = state
        .timed(async {
            let result = Inquiries::delete_many()
                .filter(Column::Kind.eq(kind))
                .filter(Column::Id.is_in(ids.iter().copied()))
                .exec(&state.orm)
                .await?;
            Ok::<_, AppError>(result)
        })
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound(format!(
            "No {} found with the provided IDs",
            label(kind).to_lowercase()
        )));
    }

    audit_quietly(
        state,
        Some(user.user_id),
        "inquiry_delete",
        "inquiries",
        serde_json::json!({ "kind": kind, "ids": ids }),
    )
    .await;

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({ "ids": ids, "deleted": result.rows_affected }),
        Some(Meta::empty()),
    ))
}

pub async fn set_inquiry_read(
    state: &AppState,
    user: &AuthUser,
    kind: InquiryKind,
    payload: UpdateInquiryReadRequest,
) -> AppResult<ApiResponse<Inquiry>> {
    ensure_staff(user)?;

    let inquiry = state
        .timed(async {
            let existing = Inquiries::find_by_id(payload.id)
                .filter(Column::Kind.eq(kind))
                .one(&state.orm)
                .await?;
            let existing = match existing {
                Some(i) => i,
                None => return Err(AppError::not_found(label(kind))),
            };
            let mut active: ActiveModel = existing.into();
            active.read = Set(payload.read);
            let inquiry = active.update(&state.orm).await?;
            Ok::<_, AppError>(inquiry)
        })
        .await?;

    audit_quietly(
        state,
        Some(user.user_id),
        "inquiry_read_update",
        "inquiries",
        serde_json::json!({ "inquiry_id": inquiry.id, "read": inquiry.read }),
    )
    .await;

    Ok(ApiResponse::success("Updated", Inquiry::from(inquiry), Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_do_not_count_as_present() {
        assert_eq!(required("  Ada "), Some("Ada".to_string()));
        assert_eq!(required("   "), None);
        assert_eq!(required(""), None);
    }
}
