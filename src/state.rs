use std::sync::Arc;

use crate::{
    auth::password::CredentialHasher,
    config::AppConfig,
    db::Database,
    foods::services::FoodStore,
    storage::{LocalStorage, StorageClient},
    users::services::AccountStore,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<AppConfig>,
    pub accounts: AccountStore,
    pub foods: FoodStore,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let db = Database::connect(&config.database_url, config.db_max_connections).await?;
        db.migrate().await?;

        let storage = Arc::new(LocalStorage::new(&config.image_dir).await?) as Arc<dyn StorageClient>;
        let hasher = CredentialHasher::new(&config.hash)?;

        Ok(Self::from_parts(db, Arc::new(config), hasher, storage))
    }

    pub fn from_parts(
        db: Database,
        config: Arc<AppConfig>,
        hasher: CredentialHasher,
        storage: Arc<dyn StorageClient>,
    ) -> Self {
        let accounts = AccountStore::new(db.users(), hasher);
        let foods = FoodStore::new(db.foods(), storage, config.food_image_mode);
        Self {
            db,
            config,
            accounts,
            foods,
        }
    }

    /// In-memory SQLite, a temp image directory and cheap hashing.
    #[cfg(test)]
    pub async fn fake() -> (Self, tempfile::TempDir) {
        use crate::config::{FoodImageMode, HashConfig};

        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            db_max_connections: 1,
            host: "127.0.0.1".into(),
            port: 0,
            image_dir: dir.path().join("images"),
            food_image_mode: FoodImageMode::File,
            max_upload_bytes: 1024 * 1024,
            hash: HashConfig {
                memory_kib: 8,
                iterations: 1,
                parallelism: 1,
            },
        };
        let state = Self::from_config(config).await.expect("fake state");
        (state, dir)
    }
}
