use async_trait::async_trait;
use sqlx::{PgPool, SqlitePool};

use crate::users::repo_types::{NewUser, ProfileUpdate, User};

macro_rules! user_columns {
    () => {
        "id, unique_id, name, email, username, password_hash, salt, verify_status, \
         pfp, pfp_ext, profession, date_of_birth, created_at"
    };
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new user. UNIQUE violations come back as `sqlx::Error::Database`.
    async fn insert(&self, user: &NewUser) -> Result<User, sqlx::Error>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, sqlx::Error>;
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error>;
    /// Apply one field change and return the updated row, `None` if no such user.
    async fn update(
        &self,
        unique_id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<User>, sqlx::Error>;
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (unique_id, name, email, password_hash, salt, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING ",
            user_columns!()
        ))
        .bind(&user.unique_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE unique_id = $1"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update(
        &self,
        unique_id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = match update {
            ProfileUpdate::Picture { data, ext } => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET pfp = $1, pfp_ext = $2 WHERE unique_id = $3 RETURNING ",
                user_columns!()
            ))
            .bind(data)
            .bind(ext),
            ProfileUpdate::Profession(profession) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET profession = $1 WHERE unique_id = $2 RETURNING ",
                user_columns!()
            ))
            .bind(profession),
            ProfileUpdate::DateOfBirth(dob) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET date_of_birth = $1 WHERE unique_id = $2 RETURNING ",
                user_columns!()
            ))
            .bind(dob),
            ProfileUpdate::Username(username) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET username = $1 WHERE unique_id = $2 RETURNING ",
                user_columns!()
            ))
            .bind(username),
        };
        query.bind(unique_id).fetch_optional(&self.pool).await
    }
}

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "INSERT INTO users (unique_id, name, email, password_hash, salt, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING ",
            user_columns!()
        ))
        .bind(&user.unique_id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.salt)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE email = ?"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE unique_id = ?"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(concat!(
            "SELECT ",
            user_columns!(),
            " FROM users WHERE username = ?"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    async fn update(
        &self,
        unique_id: &str,
        update: ProfileUpdate,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = match update {
            ProfileUpdate::Picture { data, ext } => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET pfp = ?, pfp_ext = ? WHERE unique_id = ? RETURNING ",
                user_columns!()
            ))
            .bind(data)
            .bind(ext),
            ProfileUpdate::Profession(profession) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET profession = ? WHERE unique_id = ? RETURNING ",
                user_columns!()
            ))
            .bind(profession),
            ProfileUpdate::DateOfBirth(dob) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET date_of_birth = ? WHERE unique_id = ? RETURNING ",
                user_columns!()
            ))
            .bind(dob),
            ProfileUpdate::Username(username) => sqlx::query_as::<_, User>(concat!(
                "UPDATE users SET username = ? WHERE unique_id = ? RETURNING ",
                user_columns!()
            ))
            .bind(username),
        };
        query.bind(unique_id).fetch_optional(&self.pool).await
    }
}
