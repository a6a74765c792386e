mod support;

use storefront_api::{
    dto::{
        auth::{LoginRequest, RegisterRequest},
        users::ChangePasswordRequest,
    },
    entity::users::Role,
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::Pagination,
    services::{admin_service, auth_service},
    state::AppState,
};
use support::{create_user, setup};

async fn register(state: &AppState, email: &str, password: &str) -> anyhow::Result<AuthUser> {
    let user = auth_service::register_user(
        state,
        RegisterRequest {
            firstname: "Margaret".into(),
            lastname: Some("Hamilton".into()),
            email: Some(email.into()),
            phonenumber: None,
            password: password.into(),
        },
    )
    .await?
    .data
    .expect("user");
    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

async fn login(state: &AppState, email: &str, password: &str) -> Result<(), AppError> {
    auth_service::login_user(
        state,
        LoginRequest {
            identifier: email.into(),
            password: password.into(),
        },
    )
    .await
    .map(|_| ())
}

#[tokio::test]
async fn password_change_requires_the_current_password() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let user = register(state, "margaret@example.com", "apollo-guidance").await?;

    let err = auth_service::change_password(
        state,
        &user,
        ChangePasswordRequest {
            current_password: "wrong-password".into(),
            new_password: "lunar-module".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth_service::change_password(
        state,
        &user,
        ChangePasswordRequest {
            current_password: "apollo-guidance".into(),
            new_password: "short".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    auth_service::change_password(
        state,
        &user,
        ChangePasswordRequest {
            current_password: "apollo-guidance".into(),
            new_password: "lunar-module".into(),
        },
    )
    .await?;

    let err = login(state, "margaret@example.com", "apollo-guidance").await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
    login(state, "margaret@example.com", "lunar-module").await?;
    Ok(())
}

#[tokio::test]
async fn user_listing_pages_through_every_account() -> anyhow::Result<()> {
    let app = setup().await?;
    let state = &app.state;
    let admin = create_user(state, Role::Admin, "admin@example.com").await?;
    let client = create_user(state, Role::Client, "client@example.com").await?;
    create_user(state, Role::SuperAdmin, "root@example.com").await?;

    let err = admin_service::list_users(state, &client, Pagination::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));

    let page = admin_service::list_users(state, &admin, Pagination::new(1, 2)).await?;
    assert_eq!(page.data.expect("users").items.len(), 2);
    assert_eq!(page.meta.expect("meta").total, Some(3));
    Ok(())
}
