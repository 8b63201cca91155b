use async_trait::async_trait;
use sqlx::{PgPool, SqlitePool};

use crate::foods::repo_types::{FoodItem, FoodSummary, NewFoodItem};

macro_rules! food_columns {
    () => {
        "id, unique_id, food_name, food_type, food_state, image_path, image_data, image_ext, created_at"
    };
}

#[async_trait]
pub trait FoodRepository: Send + Sync {
    async fn insert(&self, item: &NewFoodItem) -> Result<FoodItem, sqlx::Error>;
    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<FoodItem>, sqlx::Error>;
    /// Oldest first.
    async fn list(&self) -> Result<Vec<FoodSummary>, sqlx::Error>;
    /// Returns false when nothing was deleted.
    async fn delete(&self, unique_id: &str) -> Result<bool, sqlx::Error>;
}

pub struct PgFoodRepository {
    pool: PgPool,
}

impl PgFoodRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FoodRepository for PgFoodRepository {
    async fn insert(&self, item: &NewFoodItem) -> Result<FoodItem, sqlx::Error> {
        sqlx::query_as::<_, FoodItem>(concat!(
            "INSERT INTO food_items \
             (unique_id, food_name, food_type, food_state, image_path, image_data, image_ext, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING ",
            food_columns!()
        ))
        .bind(&item.unique_id)
        .bind(&item.food_name)
        .bind(&item.food_type)
        .bind(&item.food_state)
        .bind(&item.image_path)
        .bind(&item.image_data)
        .bind(&item.image_ext)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<FoodItem>, sqlx::Error> {
        sqlx::query_as::<_, FoodItem>(concat!(
            "SELECT ",
            food_columns!(),
            " FROM food_items WHERE unique_id = $1"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<FoodSummary>, sqlx::Error> {
        sqlx::query_as::<_, FoodSummary>(
            "SELECT unique_id, food_state FROM food_items ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn delete(&self, unique_id: &str) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM food_items WHERE unique_id = $1")
            .bind(unique_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

pub struct SqliteFoodRepository {
    pool: SqlitePool,
}

impl SqliteFoodRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FoodRepository for SqliteFoodRepository {
    async fn insert(&self, item: &NewFoodItem) -> Result<FoodItem, sqlx::Error> {
        sqlx::query_as::<_, FoodItem>(concat!(
            "INSERT INTO food_items \
             (unique_id, food_name, food_type, food_state, image_path, image_data, image_ext, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING ",
            food_columns!()
        ))
        .bind(&item.unique_id)
        .bind(&item.food_name)
        .bind(&item.food_type)
        .bind(&item.food_state)
        .bind(&item.image_path)
        .bind(&item.image_data)
        .bind(&item.image_ext)
        .bind(item.created_at)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_unique_id(&self, unique_id: &str) -> Result<Option<FoodItem>, sqlx::Error> {
        sqlx::query_as::<_, FoodItem>(concat!(
            "SELECT ",
            food_columns!(),
            " FROM food_items WHERE unique_id = ?"
        ))
        .bind(unique_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn list(&self) -> Result<Vec<FoodSummary>, sqlx::Error> {
        sqlx::query_as::<_, FoodSummary>(
            "SELECT unique_id, food_state FROM food_items ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
    }

    async fn delete(&self, unique_id: &str) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM food_items WHERE unique_id = ?")
            .bind(unique_id)
            .execute(&self.pool)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}
