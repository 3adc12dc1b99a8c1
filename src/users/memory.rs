use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::info;

use crate::users::error::{UserError, UserResult};
use crate::users::repo::UserRepository;
use crate::users::repo_types::{NewUser, User, UserUpdate};

#[derive(Debug, Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Table {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        let email = email.to_lowercase();
        self.rows
            .values()
            .any(|u| Some(u.id) != except && u.email.to_lowercase() == email)
    }
}

/// Map-backed repository used in tests and when no database is configured.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: i64) -> UserResult<Option<User>> {
        Ok(self.table.read().await.rows.get(&id).cloned())
    }

    async fn get_all(&self) -> UserResult<Vec<User>> {
        Ok(self.table.read().await.rows.values().cloned().collect())
    }

    async fn add(&self, user: NewUser) -> UserResult<User> {
        // check and insert under one write guard
        let mut table = self.table.write().await;
        if table.email_taken(&user.email, None) {
            return Err(UserError::DuplicateEmail(user.email));
        }

        table.last_id += 1;
        let stored = User {
            id: table.last_id,
            name: user.name,
            email: user.email,
            phone: user.phone,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        table.rows.insert(stored.id, stored.clone());

        info!(user_id = stored.id, "stored user in memory");
        Ok(stored)
    }

    async fn update(&self, user: &UserUpdate) -> UserResult<()> {
        let mut table = self.table.write().await;
        if !table.rows.contains_key(&user.id) {
            return Ok(());
        }
        if table.email_taken(&user.email, Some(user.id)) {
            return Err(UserError::DuplicateEmail(user.email.clone()));
        }
        if let Some(row) = table.rows.get_mut(&user.id) {
            row.name = user.name.clone();
            row.email = user.email.clone();
            row.phone = user.phone.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> UserResult<()> {
        self.table.write().await.rows.remove(&id);
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let email = email.to_lowercase();
        let table = self.table.read().await;
        Ok(table
            .rows
            .values()
            .find(|u| u.email.to_lowercase() == email)
            .cloned())
    }

    async fn update_password(&self, id: i64, password_hash: &str) -> UserResult<bool> {
        let mut table = self.table.write().await;
        match table.rows.get_mut(&id) {
            Some(row) => {
                row.password_hash = password_hash.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
