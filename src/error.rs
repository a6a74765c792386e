use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden {0}")]
    Forbidden(String),

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Operation timed out")]
    Timeout,

    #[error("ORM error")]
    OrmError(DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(format!("{} not found", what.into()))
    }
}

// Unique violations surface as conflicts, everything else is a storage failure.
impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return AppError::Conflict(detail);
        }
        AppError::OrmError(err)
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::OrmError(err) => {
                tracing::error!(error = %err, "database error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let message = self.to_string();

        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kinds_map_to_distinct_statuses() {
        let cases = [
            (AppError::not_found("Order"), StatusCode::NOT_FOUND),
            (AppError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (AppError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (AppError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (AppError::Conflict("x".into()), StatusCode::CONFLICT),
            (AppError::Timeout, StatusCode::GATEWAY_TIMEOUT),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::not_found("Review").to_string(), "Review not found");
    }
}
