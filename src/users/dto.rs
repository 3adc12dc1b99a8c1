use serde::{Deserialize, Serialize};

use crate::users::repo_types::User;

pub const LOGIN_SUCCESS: &str = "Login successful";

/// Request body for user creation.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Request body for a full profile replace. `password` is only accepted so
/// that it can be refused explicitly.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    #[serde(default)]
    pub password: Option<String>,
}

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserResponse {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            email: u.email,
            phone: u.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: String,
    pub user_details: UserResponse,
}

impl LoginResponse {
    pub fn success(user: User) -> Self {
        Self {
            message: LOGIN_SUCCESS.to_string(),
            user_details: user.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn login_response_uses_camel_case_and_hides_hash() {
        let user = User {
            id: 3,
            name: "Ann".into(),
            email: "Ann@x.com".into(),
            phone: "555".into(),
            password_hash: "$argon2id$secret".into(),
            created_at: OffsetDateTime::now_utc(),
        };

        let json = serde_json::to_value(LoginResponse::success(user)).unwrap();
        assert_eq!(json["message"], "Login successful");
        assert_eq!(json["userDetails"]["email"], "Ann@x.com");
        assert!(json["userDetails"].get("password").is_none());
        assert!(!json.to_string().contains("argon2"));
    }

    #[test]
    fn update_request_password_is_optional() {
        let body: UpdateUserRequest = serde_json::from_str(
            r#"{"id":1,"name":"Ann","email":"a@x.com","phone":"555"}"#,
        )
        .unwrap();
        assert!(body.password.is_none());
    }
}
