use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::{OsRng, RngCore};
use sea_orm::{ActiveModelTrait, ColumnTrait, Condition, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    audit::audit_quietly,
    config::AppConfig,
    dto::auth::{
        Claims, ForgotPasswordRequest, LoginRequest, LoginResponse, RegisterRequest,
        ResetPasswordRequest, UpdateProfileRequest,
    },
    dto::users::ChangePasswordRequest,
    entity::users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel, Role},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, role_name},
    models::User,
    notify::{Notification, dispatch},
    response::{ApiResponse, Meta},
    state::AppState,
};

const MIN_PASSWORD_LEN: usize = 8;
const RESET_CODE_TTL_MINUTES: i64 = 15;

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let RegisterRequest {
        firstname,
        lastname,
        email,
        phonenumber,
        password,
    } = payload;

    let email = email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());
    let phonenumber = phonenumber.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

    if firstname.trim().is_empty() {
        return Err(AppError::BadRequest("firstname is required".into()));
    }
    if email.is_none() && phonenumber.is_none() {
        return Err(AppError::BadRequest("email or phone number is required".into()));
    }
    if let Some(email) = &email {
        if !looks_like_email(email) {
            return Err(AppError::BadRequest("Invalid email format".into()));
        }
    }
    validate_password(&password)?;
    let password_hash = hash_secret(&password)?;

    let mut taken = Condition::any();
    if let Some(email) = &email {
        taken = taken.add(UserCol::Email.eq(email.clone()));
    }
    if let Some(phone) = &phonenumber {
        taken = taken.add(UserCol::Phonenumber.eq(phone.clone()));
    }
    let user = state
        .timed(async {
            if Users::find().filter(taken).one(&state.orm).await?.is_some() {
                return Err(AppError::Conflict("Email or phone number is already taken".into()));
            }

            let user = UserActive {
                id: Set(Uuid::new_v4()),
                firstname: Set(firstname.trim().to_string()),
                lastname: Set(lastname),
                email: Set(email),
                phonenumber: Set(phonenumber),
                password_hash: Set(password_hash),
                role: Set(Role::Client),
                reset_code_hash: Set(None),
                reset_code_expires_at: Set(None),
                address: Set(None),
                city: Set(None),
                zip_code: Set(None),
                country: Set(None),
                created_at: Set(Utc::now().into()),
            }
            .insert(&state.orm)
            .await?;
            Ok::<_, AppError>(user)
        })
        .await?;

    audit_quietly(
        state,
        Some(user.id),
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User created", User::from(user), None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let LoginRequest {
        identifier,
        password,
    } = payload;

    let user = match state.timed(find_by_identifier(state, &identifier)).await? {
        Some(u) => u,
        None => return Err(AppError::Unauthorized("Invalid credentials".into())),
    };

    if !verify_secret(&user.password_hash, &password)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let token = issue_token(&state.config, user.id, user.role)?;

    audit_quietly(
        state,
        Some(user.id),
        "user_login",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Logged in",
        LoginResponse {
            token: format!("Bearer {}", token),
            user: User::from(user),
        },
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let found = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let found = match found {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };
    Ok(ApiResponse::success("User", User::from(found), None))
}

pub async fn update_profile(
    state: &AppState,
    user: &AuthUser,
    payload: UpdateProfileRequest,
) -> AppResult<ApiResponse<User>> {
    let existing = Users::find_by_id(user.user_id).one(&state.orm).await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    let mut active: UserActive = existing.into();
    if let Some(firstname) = payload.firstname.filter(|f| !f.trim().is_empty()) {
        active.firstname = Set(firstname);
    }
    if let Some(lastname) = payload.lastname {
        active.lastname = Set(Some(lastname));
    }
    if let Some(address) = payload.address {
        active.address = Set(Some(address));
    }
    if let Some(city) = payload.city {
        active.city = Set(Some(city));
    }
    if let Some(zip_code) = payload.zip_code {
        active.zip_code = Set(Some(zip_code));
    }
    if let Some(country) = payload.country {
        active.country = Set(Some(country));
    }
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Profile updated", User::from(updated), None))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let code = format!("{:06}", OsRng.next_u32() % 1_000_000);
    let code_hash = hash_secret(&code)?;
    let expires_at = Utc::now() + Duration::minutes(RESET_CODE_TTL_MINUTES);

    let contact = state
        .timed(async {
            let user = match find_by_identifier(state, &payload.identifier).await? {
                Some(u) => u,
                None => return Err(AppError::not_found("User")),
            };
            let Some(contact) = user.contact().map(str::to_string) else {
                return Err(AppError::BadRequest("User has no contact address".into()));
            };

            let mut active: UserActive = user.into();
            active.reset_code_hash = Set(Some(code_hash));
            active.reset_code_expires_at = Set(Some(expires_at.into()));
            active.update(&state.orm).await?;
            Ok::<_, AppError>(contact)
        })
        .await?;

    dispatch(state.notifier.clone(), Notification::password_reset(contact, &code));

    Ok(ApiResponse::success(
        "Reset code sent",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let user = match state.timed(find_by_identifier(state, &payload.identifier)).await? {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };

    let (Some(hash), Some(expires_at)) = (&user.reset_code_hash, user.reset_code_expires_at) else {
        return Err(AppError::BadRequest("Invalid or expired reset code".into()));
    };
    if expires_at.with_timezone(&Utc) < Utc::now() || !verify_secret(hash, &payload.code)? {
        return Err(AppError::BadRequest("Invalid or expired reset code".into()));
    }
    validate_password(&payload.new_password)?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_secret(&payload.new_password)?);
    active.reset_code_hash = Set(None);
    active.reset_code_expires_at = Set(None);
    state
        .timed(async { active.update(&state.orm).await.map_err(AppError::from) })
        .await?;

    audit_quietly(
        state,
        Some(user_id),
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password updated",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Password change for a signed-in user; the current password must verify first.
pub async fn change_password(
    state: &AppState,
    user: &AuthUser,
    payload: ChangePasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    validate_password(&payload.new_password)?;

    let existing = state
        .timed(async { Users::find_by_id(user.user_id).one(&state.orm).await.map_err(AppError::from) })
        .await?;
    let existing = match existing {
        Some(u) => u,
        None => return Err(AppError::not_found("User")),
    };
    if !verify_secret(&existing.password_hash, &payload.current_password)? {
        return Err(AppError::BadRequest("Current password is incorrect".into()));
    }

    let mut active: UserActive = existing.into();
    active.password_hash = Set(hash_secret(&payload.new_password)?);
    active.reset_code_hash = Set(None);
    active.reset_code_expires_at = Set(None);
    state
        .timed(async { active.update(&state.orm).await.map_err(AppError::from) })
        .await?;

    tracing::info!(user_id = %user.user_id, "password changed");
    audit_quietly(
        state,
        Some(user.user_id),
        "password_change",
        "users",
        serde_json::json!({ "user_id": user.user_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Sign a bearer token for the given principal.
pub fn issue_token(config: &AppConfig, user_id: Uuid, role: Role) -> AppResult<String> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(config.jwt_ttl_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role: role_name(role).to_string(),
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn hash_secret(secret: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_secret(hash: &str, candidate: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok())
}

async fn find_by_identifier(state: &AppState, identifier: &str) -> AppResult<Option<UserModel>> {
    let identifier = identifier.trim();
    let user = Users::find()
        .filter(
            Condition::any()
                .add(UserCol::Email.eq(identifier.to_lowercase()))
                .add(UserCol::Phonenumber.eq(identifier)),
        )
        .one(&state.orm)
        .await?;
    Ok(user)
}

fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

pub(crate) fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
