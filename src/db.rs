use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use sqlx::{
    postgres::PgPoolOptions,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    PgPool, SqlitePool,
};
use tracing::info;

use crate::{
    foods::repo::{FoodRepository, PgFoodRepository, SqliteFoodRepository},
    users::repo::{PgUserRepository, SqliteUserRepository, UserRepository},
};

/// The one database handle of the process. Created at startup, closed on shutdown.
#[derive(Clone, Debug)]
pub enum Database {
    Postgres(PgPool),
    Sqlite(SqlitePool),
}

impl Database {
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(max_connections)
                .connect(url)
                .await
                .context("connect to postgres")?;
            info!("connected to postgres");
            return Ok(Self::Postgres(pool));
        }

        if url.starts_with("sqlite:") {
            let opts = SqliteConnectOptions::from_str(url)
                .context("parse sqlite url")?
                .create_if_missing(true);
            // every connection to :memory: is its own database
            let pool_opts = if url.contains(":memory:") {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
            } else {
                SqlitePoolOptions::new().max_connections(max_connections)
            };
            let pool = pool_opts
                .connect_with(opts)
                .await
                .context("open sqlite database")?;
            info!("connected to sqlite");
            return Ok(Self::Sqlite(pool));
        }

        anyhow::bail!("unsupported DATABASE_URL scheme (expected postgres:// or sqlite:)")
    }

    /// Bring the schema in line with the embedded migrations.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        match self {
            Self::Postgres(pool) => sqlx::migrate!("./migrations/postgres")
                .run(pool)
                .await
                .context("postgres migrations")?,
            Self::Sqlite(pool) => sqlx::migrate!("./migrations/sqlite")
                .run(pool)
                .await
                .context("sqlite migrations")?,
        }
        Ok(())
    }

    pub fn users(&self) -> Arc<dyn UserRepository> {
        match self {
            Self::Postgres(pool) => Arc::new(PgUserRepository::new(pool.clone())),
            Self::Sqlite(pool) => Arc::new(SqliteUserRepository::new(pool.clone())),
        }
    }

    pub fn foods(&self) -> Arc<dyn FoodRepository> {
        match self {
            Self::Postgres(pool) => Arc::new(PgFoodRepository::new(pool.clone())),
            Self::Sqlite(pool) => Arc::new(SqliteFoodRepository::new(pool.clone())),
        }
    }

    pub async fn close(&self) {
        match self {
            Self::Postgres(pool) => pool.close().await,
            Self::Sqlite(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let db = Database::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory sqlite");
    db.migrate().await.expect("migrations");
    db
}
