use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    cache::invalidate_catalog,
    dto::reviews::{CreateReviewRequest, ReviewList, UpdateReviewStatusRequest},
    entity::{
        order_items::Entity as OrderItems,
        orders::{Entity as Orders, OrderStatus},
        products::{Column as ProdCol, Entity as Products},
        reviews::{ActiveModel as ReviewActive, Column as ReviewCol, Entity as Reviews, ReviewStatus},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_client, ensure_staff},
    models::Review,
    response::{ApiResponse, Meta},
    routes::params::ReviewListQuery,
    state::AppState,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

pub fn parse_review_status(raw: &str) -> AppResult<ReviewStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Ok(ReviewStatus::Pending),
        "approved" => Ok(ReviewStatus::Approved),
        "rejected" => Ok(ReviewStatus::Rejected),
        other => Err(AppError::BadRequest(format!("Invalid review status: {other}"))),
    }
}

/// Arithmetic mean of the ratings, 0 when there are none.
pub fn mean_rating(ratings: &[i32]) -> f64 {
    if ratings.is_empty() {
        return 0.0;
    }
    let sum: i64 = ratings.iter().map(|r| i64::from(*r)).sum();
    sum as f64 / ratings.len() as f64
}

/// Recompute and store a product's average over its approved reviews.
/// Callers run this inside the transaction that changed a review.
pub async fn refresh_average_rating<C: ConnectionTrait>(conn: &C, product_id: Uuid) -> AppResult<f64> {
    let locked = Products::find_by_id(product_id)
        .lock(LockType::Update)
        .one(conn)
        .await?;
    if locked.is_none() {
        return Err(AppError::not_found("Product"));
    }

    let ratings: Vec<i32> = Reviews::find()
        .select_only()
        .column(ReviewCol::Rating)
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::Status.eq(ReviewStatus::Approved))
        .into_tuple()
        .all(conn)
        .await?;
    let average = mean_rating(&ratings);

    Products::update_many()
        .col_expr(ProdCol::AverageRating, Expr::value(average))
        .filter(ProdCol::Id.eq(product_id))
        .exec(conn)
        .await?;
    Ok(average)
}

/// Files a pending review for a line of the caller's completed order.
pub async fn create_review(
    state: &AppState,
    user: &AuthUser,
    payload: CreateReviewRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_client(user)?;
    if !(MIN_RATING..=MAX_RATING).contains(&payload.rating) {
        return Err(AppError::BadRequest(format!(
            "Rating must be between {MIN_RATING} and {MAX_RATING}"
        )));
    }
    let comment = payload.comment.trim().to_string();
    if comment.is_empty() {
        return Err(AppError::BadRequest("Comment is required".into()));
    }

    let review = state
        .timed(async {
            let item = OrderItems::find_by_id(payload.order_item_id)
                .one(&state.orm)
                .await?;
            let item = match item {
                Some(i) => i,
                None => return Err(AppError::not_found("Order item")),
            };
            let order = Orders::find_by_id(item.order_id).one(&state.orm).await?;
            let order = match order {
                Some(o) => o,
                None => return Err(AppError::not_found("Order")),
            };
            if order.user_id != user.user_id || order.status != OrderStatus::Completed {
                return Err(AppError::Forbidden(
                    "You are not eligible to review this product".into(),
                ));
            }

            let duplicate = Reviews::find()
                .filter(ReviewCol::UserId.eq(user.user_id))
                .filter(ReviewCol::OrderItemId.eq(item.id))
                .one(&state.orm)
                .await?;
            if duplicate.is_some() {
                return Err(AppError::Conflict(
                    "You have already reviewed this product".into(),
                ));
            }

            let author = Users::find_by_id(user.user_id).one(&state.orm).await?;
            let author = match author {
                Some(u) => u,
                None => return Err(AppError::not_found("User")),
            };

            // The unique index on (user_id, order_item_id) turns a racing duplicate into Conflict.
            let review = ReviewActive {
                id: Set(Uuid::new_v4()),
                rating: Set(payload.rating),
                comment: Set(comment),
                submitter_name: Set(author.display_name()),
                user_id: Set(user.user_id),
                product_id: Set(item.product_id),
                order_item_id: Set(item.id),
                status: Set(ReviewStatus::Pending),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            Ok::<_, AppError>(review)
        })
        .await?;

    audit_quietly(
        state,
        Some(user.user_id),
        "review_create",
        "reviews",
        serde_json::json!({ "review_id": review.id, "product_id": review.product_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review created",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

/// Moves a review to a new status and re-derives the product average in the same transaction.
pub async fn update_review_status(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateReviewStatusRequest,
) -> AppResult<ApiResponse<Review>> {
    ensure_staff(user)?;
    let status = parse_review_status(&payload.status)?;

    let (review, average) = state
        .timed(async {
            let txn = state.orm.begin().await?;
            let existing = Reviews::find_by_id(payload.review_id)
                .lock(LockType::Update)
                .one(&txn)
                .await?;
            let existing = match existing {
                Some(r) => r,
                None => return Err(AppError::not_found("Review")),
            };

            let mut active: ReviewActive = existing.into();
            active.status = Set(status);
            let review = active.update(&txn).await?;
            let average = refresh_average_rating(&txn, review.product_id).await?;
            txn.commit().await?;
            Ok::<_, AppError>((review, average))
        })
        .await?;

    tracing::info!(
        review_id = %review.id,
        product_id = %review.product_id,
        status = ?status,
        average,
        "review status changed"
    );
    invalidate_catalog(state.cache.as_ref(), state.cache_options()).await;
    audit_quietly(
        state,
        Some(user.user_id),
        "review_status_update",
        "reviews",
        serde_json::json!({ "review_id": review.id, "status": status, "average_rating": average }),
    )
    .await;

    Ok(ApiResponse::success(
        "Review status updated",
        Review::from(review),
        Some(Meta::empty()),
    ))
}

/// Moderation queue: every review, optionally narrowed to one status.
pub async fn list_reviews(
    state: &AppState,
    user: &AuthUser,
    query: ReviewListQuery,
) -> AppResult<ApiResponse<ReviewList>> {
    ensure_staff(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut finder = Reviews::find().order_by_desc(ReviewCol::CreatedAt);
    if let Some(raw) = query.status.as_deref().filter(|s| !s.trim().is_empty()) {
        finder = finder.filter(ReviewCol::Status.eq(parse_review_status(raw)?));
    }

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success(
        "Reviews",
        ReviewList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Approved reviews of one product, newest first.
pub async fn approved_reviews_for_product(
    state: &AppState,
    product_id: Uuid,
) -> AppResult<ApiResponse<ReviewList>> {
    if Products::find_by_id(product_id).one(&state.orm).await?.is_none() {
        return Err(AppError::not_found("Product"));
    }
    let items = Reviews::find()
        .filter(ReviewCol::ProductId.eq(product_id))
        .filter(ReviewCol::Status.eq(ReviewStatus::Approved))
        .order_by_desc(ReviewCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Review::from)
        .collect();

    Ok(ApiResponse::success("Reviews", ReviewList { items }, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_nothing_is_zero() {
        assert_eq!(mean_rating(&[]), 0.0);
    }

    #[test]
    fn mean_is_not_rounded() {
        assert_eq!(mean_rating(&[4, 5]), 4.5);
        assert!((mean_rating(&[5, 4, 4]) - 13.0 / 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn review_status_rejects_unknown_values() {
        assert_eq!(parse_review_status("APPROVED").unwrap(), ReviewStatus::Approved);
        assert!(parse_review_status("archived").is_err());
    }
}
