use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::users::{
    error::{UserError, UserResult},
    password::SecretHasher,
    repo::UserRepository,
    repo_types::{NewUser, User, UserUpdate},
};

/// Create input carrying the plaintext password.
#[derive(Debug, Clone)]
pub struct NewUserInput {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Business rules on top of a [`UserRepository`].
#[derive(Clone)]
pub struct UserService {
    repo: Arc<dyn UserRepository>,
    hasher: Arc<dyn SecretHasher>,
}

impl UserService {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: Arc<dyn SecretHasher>) -> Self {
        Self { repo, hasher }
    }

    pub async fn get_user_by_id(&self, id: i64) -> UserResult<Option<User>> {
        self.repo.get_by_id(id).await
    }

    pub async fn get_all_users(&self) -> UserResult<Vec<User>> {
        self.repo.get_all().await
    }

    /// Hashes the password and stores the user. The returned record carries
    /// the hash and must not be sent to clients as is.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn add_user(&self, input: NewUserInput) -> UserResult<User> {
        let password_hash = self.hash(input.password).await?;
        let user = self
            .repo
            .add(NewUser {
                name: input.name,
                email: input.email,
                phone: input.phone,
                password_hash,
            })
            .await?;
        info!(user_id = user.id, "user created");
        Ok(user)
    }

    /// Leaves the stored password untouched.
    pub async fn update_user(&self, user: UserUpdate) -> UserResult<UserUpdate> {
        self.repo.update(&user).await?;
        debug!(user_id = user.id, "user updated");
        Ok(user)
    }

    pub async fn delete_user(&self, id: i64) -> UserResult<()> {
        self.repo.delete(id).await?;
        debug!(user_id = id, "user deleted");
        Ok(())
    }

    #[instrument(skip(self, raw_password))]
    pub async fn authenticate(&self, email: &str, raw_password: &str) -> UserResult<User> {
        let Some(user) = self.repo.find_by_email(email).await? else {
            warn!("login unknown email");
            return Err(UserError::InvalidCredentials);
        };

        if !self.verify(raw_password, &user.password_hash).await? {
            warn!(user_id = user.id, "login invalid password");
            return Err(UserError::InvalidCredentials);
        }

        info!(user_id = user.id, "user logged in");
        Ok(user)
    }

    #[instrument(skip(self, current, new))]
    pub async fn change_password(&self, id: i64, current: &str, new: &str) -> UserResult<()> {
        let user = self
            .repo
            .get_by_id(id)
            .await?
            .ok_or(UserError::NotFound(id))?;

        if !self.verify(current, &user.password_hash).await? {
            warn!(user_id = id, "change password with wrong current password");
            return Err(UserError::InvalidCredentials);
        }

        let hash = self.hash(new.to_string()).await?;
        // deleted between the lookup and the write
        if !self.repo.update_password(id, &hash).await? {
            return Err(UserError::NotFound(id));
        }
        info!(user_id = id, "password changed");
        Ok(())
    }

    async fn hash(&self, plain: String) -> UserResult<String> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(|e| UserError::PasswordHash(e.to_string()))?
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }

    async fn verify(&self, plain: &str, hash: &str) -> UserResult<bool> {
        let hasher = Arc::clone(&self.hasher);
        let (plain, hash) = (plain.to_string(), hash.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(|e| UserError::PasswordHash(e.to_string()))?
            .map_err(|e| UserError::PasswordHash(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::{memory::InMemoryUserRepository, password::Argon2Hasher};
    use argon2::Params;

    fn service() -> UserService {
        let hasher = Argon2Hasher::with_params(Params::new(1024, 1, 1, None).unwrap());
        UserService::new(Arc::new(InMemoryUserRepository::new()), Arc::new(hasher))
    }

    fn ann() -> NewUserInput {
        NewUserInput {
            name: "Ann".into(),
            email: "Ann@x.com".into(),
            phone: "555".into(),
            password: "pw1".into(),
        }
    }

    #[tokio::test]
    async fn add_user_stores_hash_not_plaintext() {
        let svc = service();
        let created = svc.add_user(ann()).await.unwrap();

        assert!(created.id > 0);
        let stored = svc.get_user_by_id(created.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw1");
        assert!(stored.password_hash.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn add_user_rejects_case_variant_email() {
        let svc = service();
        svc.add_user(ann()).await.unwrap();

        let mut dup = ann();
        dup.email = "ann@X.com".into();
        let err = svc.add_user(dup).await.unwrap_err();
        assert!(matches!(err, UserError::DuplicateEmail(_)));
        assert_eq!(svc.get_all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_accepts_only_the_right_password() {
        let svc = service();
        let created = svc.add_user(ann()).await.unwrap();

        let user = svc.authenticate("ann@x.com", "pw1").await.unwrap();
        assert_eq!(user.id, created.id);

        assert!(matches!(
            svc.authenticate("Ann@x.com", "nope").await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.authenticate("ghost@x.com", "pw1").await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn update_user_keeps_password() {
        let svc = service();
        let created = svc.add_user(ann()).await.unwrap();

        let changes = UserUpdate {
            id: created.id,
            name: "Annie".into(),
            email: "annie@x.com".into(),
            phone: "556".into(),
        };
        let returned = svc.update_user(changes.clone()).await.unwrap();
        assert_eq!(returned, changes);

        let user = svc.authenticate("annie@x.com", "pw1").await.unwrap();
        assert_eq!(user.name, "Annie");
    }

    #[tokio::test]
    async fn delete_unknown_user_is_ok() {
        let svc = service();
        svc.delete_user(999).await.unwrap();
    }

    #[tokio::test]
    async fn change_password_swaps_credentials() {
        let svc = service();
        let created = svc.add_user(ann()).await.unwrap();

        svc.change_password(created.id, "pw1", "pw2").await.unwrap();

        assert!(svc.authenticate("ann@x.com", "pw2").await.is_ok());
        assert!(matches!(
            svc.authenticate("ann@x.com", "pw1").await,
            Err(UserError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn change_password_checks_current_and_existence() {
        let svc = service();
        let created = svc.add_user(ann()).await.unwrap();

        assert!(matches!(
            svc.change_password(created.id, "wrong", "pw2").await,
            Err(UserError::InvalidCredentials)
        ));
        assert!(matches!(
            svc.change_password(404, "pw1", "pw2").await,
            Err(UserError::NotFound(404))
        ));
    }
}
