use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::users::Role,
    error::AppError,
    state::AppState,
};

/// Authenticated principal decoded from the bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_staff(&self) -> bool {
        self.role.is_staff()
    }
}

pub fn ensure_role(user: &AuthUser, allowed: &[Role]) -> Result<(), AppError> {
    if !allowed.contains(&user.role) {
        return Err(AppError::Forbidden("insufficient role".into()));
    }
    Ok(())
}

pub fn ensure_staff(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &[Role::Admin, Role::SuperAdmin])
}

pub fn ensure_client(user: &AuthUser) -> Result<(), AppError> {
    ensure_role(user, &[Role::Client])
}

pub fn parse_role(raw: &str) -> Option<Role> {
    match raw {
        "client" => Some(Role::Client),
        "admin" => Some(Role::Admin),
        "superadmin" => Some(Role::SuperAdmin),
        _ => None,
    }
}

pub fn role_name(role: Role) -> &'static str {
    match role {
        Role::Client => "client",
        Role::Admin => "admin",
        Role::SuperAdmin => "superadmin",
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<AuthUser, AppError> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let user_id = Uuid::parse_str(&decoded.claims.sub)
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;
    let role = parse_role(&decoded.claims.role)
        .ok_or_else(|| AppError::Unauthorized("Invalid role in token".into()))?;

    Ok(AuthUser { user_id, role })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let Some(token) = auth_str.strip_prefix("Bearer ") else {
            return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
        };

        decode_token(token.trim(), &state.config.jwt_secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: Role) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn staff_gate_admits_admin_and_superadmin() {
        assert!(ensure_staff(&principal(Role::Admin)).is_ok());
        assert!(ensure_staff(&principal(Role::SuperAdmin)).is_ok());
        assert!(matches!(
            ensure_staff(&principal(Role::Client)),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn client_gate_rejects_staff() {
        assert!(ensure_client(&principal(Role::Client)).is_ok());
        assert!(ensure_client(&principal(Role::Admin)).is_err());
    }

    #[test]
    fn garbage_token_is_unauthorized() {
        assert!(matches!(
            decode_token("not-a-jwt", "secret"),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn role_names_round_trip() {
        for role in [Role::Client, Role::Admin, Role::SuperAdmin] {
            assert_eq!(parse_role(role_name(role)), Some(role));
        }
    }
}
