use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Review;

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReviewRequest {
    pub rating: i32,
    pub comment: String,
    pub order_item_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateReviewStatusRequest {
    pub review_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct ReviewList {
    #[schema(value_type = Vec<Review>)]
    pub items: Vec<Review>,
}
