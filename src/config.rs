use std::{path::PathBuf, str::FromStr};

use anyhow::Context;

/// Where food images end up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodImageMode {
    /// Content-addressed file under `image_dir`.
    File,
    /// Bytes kept in the `food_items` row.
    Inline,
}

impl FromStr for FoodImageMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "inline" => Ok(Self::Inline),
            other => anyhow::bail!("unknown FOOD_IMAGE_MODE {other:?}, expected file|inline"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HashConfig {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for HashConfig {
    fn default() -> Self {
        Self {
            memory_kib: argon2::Params::DEFAULT_M_COST,
            iterations: argon2::Params::DEFAULT_T_COST,
            parallelism: argon2::Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub host: String,
    pub port: u16,
    pub image_dir: PathBuf,
    pub food_image_mode: FoodImageMode,
    pub max_upload_bytes: usize,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let hash_defaults = HashConfig::default();
        let hash = HashConfig {
            memory_kib: parse_or("ARGON2_MEMORY_KIB", hash_defaults.memory_kib)?,
            iterations: parse_or("ARGON2_ITERATIONS", hash_defaults.iterations)?,
            parallelism: parse_or("ARGON2_PARALLELISM", hash_defaults.parallelism)?,
        };

        Ok(Self {
            database_url: database_url_from_env(),
            db_max_connections: parse_or("DB_MAX_CONNECTIONS", 10)?,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_or("APP_PORT", 3000)?,
            image_dir: std::env::var("IMAGE_DIR")
                .unwrap_or_else(|_| "images".into())
                .into(),
            food_image_mode: parse_or("FOOD_IMAGE_MODE", FoodImageMode::File)?,
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            hash,
        })
    }
}

/// `DATABASE_URL` wins; `ENV_ONLINE=True` assembles a Postgres URL from the
/// libpq-style variables; otherwise a local SQLite file.
fn database_url_from_env() -> String {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return url;
    }
    if std::env::var("ENV_ONLINE").map(|v| v == "True").unwrap_or(false) {
        let var = |k: &str| std::env::var(k).unwrap_or_default();
        return format!(
            "postgres://{}:{}@{}:{}/{}?sslmode=require",
            var("PGUSER"),
            var("PGPASSWORD"),
            var("PGHOST"),
            std::env::var("PGPORT").unwrap_or_else(|_| "5432".into()),
            var("PGDATABASE"),
        );
    }
    "sqlite://spoiler-alert.db?mode=rwc".into()
}

fn parse_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("invalid {key}={raw:?}")),
        Err(_) => Ok(default),
    }
}
