use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Inquiry;

/// Body of the public contact and quote forms. `company` only matters for quotes.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateInquiryRequest {
    pub name: String,
    pub company: Option<String>,
    pub email: String,
    pub phonenumber: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InquiryList {
    pub items: Vec<Inquiry>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeleteInquiriesRequest {
    pub ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateInquiryReadRequest {
    pub id: Uuid,
    pub read: bool,
}
