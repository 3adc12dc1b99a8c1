use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("User with email '{0}' already exists")]
    DuplicateEmail(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type UserResult<T> = Result<T, UserError>;

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::DuplicateEmail(_) => StatusCode::CONFLICT,
            UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserError::NotFound(_) => StatusCode::NOT_FOUND,
            UserError::PasswordHash(_) | UserError::Database(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        let (error_type, message) = match &self {
            UserError::Validation(msg) => ("validation_error", msg.clone()),
            UserError::DuplicateEmail(email) => (
                "duplicate",
                format!("User with email '{}' already exists", email),
            ),
            UserError::InvalidCredentials => {
                ("invalid_credentials", "Invalid email or password".to_string())
            }
            UserError::NotFound(id) => ("not_found", format!("User {} not found", id)),
            UserError::PasswordHash(msg) => {
                error!(error = %msg, "password hashing failed");
                ("internal_error", "An internal error occurred".to_string())
            }
            UserError::Database(e) => {
                error!(error = %e, "database error");
                ("internal_error", "An internal error occurred".to_string())
            }
        };

        (
            self.status(),
            Json(json!({
                "error": {
                    "type": error_type,
                    "message": message
                }
            })),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_each_kind_to_its_status() {
        assert_eq!(
            UserError::Validation("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            UserError::DuplicateEmail("a@b.c".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            UserError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(UserError::NotFound(7).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            UserError::Database(sqlx::Error::RowNotFound).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn internal_errors_hide_details() {
        let res = UserError::PasswordHash("salt exploded".into()).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
