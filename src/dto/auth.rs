use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::User;

#[derive(Deserialize, Debug, ToSchema)]
pub struct RegisterRequest {
    pub firstname: String,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub phonenumber: Option<String>,
    pub password: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct LoginRequest {
    /// Email address or phone number.
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateProfileRequest {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip_code: Option<String>,
    pub country: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ForgotPasswordRequest {
    pub identifier: String,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct ResetPasswordRequest {
    pub identifier: String,
    pub code: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}
