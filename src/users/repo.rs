use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use crate::users::error::{UserError, UserResult};
use crate::users::repo_types::{NewUser, User, UserUpdate};

/// Persistence for user records.
///
/// Implementations own the case-insensitive email uniqueness rule: `add` and
/// `update` report a collision as [`UserError::DuplicateEmail`] atomically,
/// callers never check first.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>>;

    /// All users, ordered by id.
    async fn get_all(&self) -> UserResult<Vec<User>>;

    /// Insert and return the stored row with its assigned id.
    async fn add(&self, user: NewUser) -> UserResult<User>;

    /// Replace name, email and phone. Unknown ids are ignored.
    async fn update(&self, user: &UserUpdate) -> UserResult<()>;

    /// Remove a user. Unknown ids are ignored.
    async fn delete(&self, id: i64) -> UserResult<()>;

    /// Case-insensitive lookup.
    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Returns `false` when no user has this id.
    async fn update_password(&self, id: i64, password_hash: &str) -> UserResult<bool>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

/// Turns a hit on `users_email_lower_idx` into a conflict.
fn map_unique(e: sqlx::Error, email: &str) -> UserError {
    match &e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            debug!(email = %email, "unique violation on users.email");
            UserError::DuplicateEmail(email.to_string())
        }
        _ => UserError::Database(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn get_all(&self) -> UserResult<Vec<User>> {
        let rows = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, created_at
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn add(&self, user: NewUser) -> UserResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, phone, password_hash, created_at
            "#,
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique(e, &user.email))
    }

    async fn update(&self, user: &UserUpdate) -> UserResult<()> {
        sqlx::query(
            r#"
            UPDATE users
               SET name = $2, email = $3, phone = $4
             WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .execute(&self.db)
        .await
        .map_err(|e| map_unique(e, &user.email))?;
        Ok(())
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, created_at
            FROM users
            WHERE lower(email) = lower($1)
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> UserResult<bool> {
        let res = sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
