use std::sync::Arc;

use argon2::Params;
use tracing::warn;

use crate::config::{AppConfig, ServerConfig};
use crate::db;
use crate::users::{
    memory::InMemoryUserRepository,
    password::{Argon2Hasher, SecretHasher},
    repo::{PgUserRepository, UserRepository},
    services::UserService,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: UserService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let repo: Arc<dyn UserRepository> = match &config.database_url {
            Some(url) => {
                let pool = db::connect(url, &config).await?;
                db::migrate(&pool).await?;
                Arc::new(PgUserRepository::new(pool))
            }
            None => {
                warn!("DATABASE_URL not set; users are kept in memory and lost on restart");
                Arc::new(InMemoryUserRepository::new())
            }
        };

        let hasher = Arc::new(Argon2Hasher::default()) as Arc<dyn SecretHasher>;
        Ok(Self::from_parts(config, UserService::new(repo, hasher)))
    }

    pub fn from_parts(config: Arc<AppConfig>, users: UserService) -> Self {
        Self { config, users }
    }

    /// In-memory store and low-cost argon2 params, for tests.
    pub fn fake() -> Self {
        let params = Params::new(1024, 1, 1, None).expect("argon2 params ok");
        let hasher = Arc::new(Argon2Hasher::with_params(params)) as Arc<dyn SecretHasher>;
        let repo = Arc::new(InMemoryUserRepository::new()) as Arc<dyn UserRepository>;

        let config = Arc::new(AppConfig {
            database_url: None,
            db_max_connections: 1,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 0,
            },
        });

        Self::from_parts(config, UserService::new(repo, hasher))
    }
}
