use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{instrument, warn};

use crate::{
    state::AppState,
    users::{
        dto::{
            ChangePasswordRequest, CreateUserRequest, LoginRequest, LoginResponse,
            UpdateUserRequest, UserResponse,
        },
        error::{UserError, UserResult},
        repo_types::UserUpdate,
        services::NewUserInput,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(get_all_users).post(add_user))
        .route("/api/users/login", post(login))
        .route(
            "/api/users/:id",
            get(get_user_by_id).put(update_user).delete(delete_user),
        )
        .route("/api/users/:id/password", post(change_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

/// Absent or unparsable bodies are all a 400.
fn require_body<T>(payload: Result<Json<T>, JsonRejection>, message: &str) -> UserResult<T> {
    match payload {
        Ok(Json(body)) => Ok(body),
        Err(rejection) => {
            warn!(rejection = %rejection.body_text(), "rejected request body");
            Err(UserError::Validation(message.to_string()))
        }
    }
}

#[instrument(skip(state))]
pub async fn get_user_by_id(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> UserResult<Json<UserResponse>> {
    let user = state
        .users
        .get_user_by_id(id)
        .await?
        .ok_or(UserError::NotFound(id))?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn get_all_users(State(state): State<AppState>) -> UserResult<Json<Vec<UserResponse>>> {
    let users = state.users.get_all_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn add_user(
    State(state): State<AppState>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> UserResult<Json<UserResponse>> {
    let mut body = require_body(payload, "Invalid client request")?;
    body.email = body.email.trim().to_string();

    if !is_valid_email(&body.email) {
        warn!(email = %body.email, "invalid email");
        return Err(UserError::Validation("Invalid email".into()));
    }
    if body.password.is_empty() {
        return Err(UserError::Validation("Password must not be empty".into()));
    }

    let created = state
        .users
        .add_user(NewUserInput {
            name: body.name,
            email: body.email,
            phone: body.phone,
            password: body.password,
        })
        .await?;
    Ok(Json(created.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> UserResult<StatusCode> {
    let body = require_body(payload, "Invalid client request")?;

    if body.id != id {
        warn!(path_id = id, body_id = body.id, "update id mismatch");
        return Err(UserError::Validation(
            "Path id does not match body id".into(),
        ));
    }
    if body.password.is_some() {
        return Err(UserError::Validation(
            "Password cannot be changed here; use /api/users/{id}/password".into(),
        ));
    }

    let email = body.email.trim().to_string();
    if !is_valid_email(&email) {
        return Err(UserError::Validation("Invalid email".into()));
    }

    state
        .users
        .update_user(UserUpdate {
            id,
            name: body.name,
            email,
            phone: body.phone,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> UserResult<StatusCode> {
    state.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> UserResult<Json<LoginResponse>> {
    let body = require_body(payload, "Invalid client request")?;
    let user = state
        .users
        .authenticate(body.email.trim(), &body.password)
        .await?;
    Ok(Json(LoginResponse::success(user)))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> UserResult<StatusCode> {
    let body = require_body(payload, "Invalid client request")?;
    if body.new_password.is_empty() {
        return Err(UserError::Validation("Password must not be empty".into()));
    }
    state
        .users
        .change_password(id, &body.current_password, &body.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("Ann@x.com"));
        assert!(is_valid_email("a.b+c@sub.example.org"));
        assert!(!is_valid_email("ann"));
        assert!(!is_valid_email("ann@x"));
        assert!(!is_valid_email("a n@x.com"));
        assert!(!is_valid_email(""));
    }
}
