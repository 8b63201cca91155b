use sqlx::FromRow;
use time::OffsetDateTime;

/// Food item record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct FoodItem {
    pub id: i64,
    pub unique_id: String,
    pub food_name: String,
    pub food_type: String,
    pub food_state: String,
    pub image_path: Option<String>, // storage key, file mode
    pub image_data: Option<Vec<u8>>, // inline mode
    pub image_ext: Option<String>,
    pub created_at: OffsetDateTime,
}

impl FoodItem {
    pub fn has_image(&self) -> bool {
        self.image_path.is_some() || self.image_data.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct NewFoodItem {
    pub unique_id: String,
    pub food_name: String,
    pub food_type: String,
    pub food_state: String,
    pub image_path: Option<String>,
    pub image_data: Option<Vec<u8>>,
    pub image_ext: Option<String>,
    pub created_at: OffsetDateTime,
}

/// The columns listing needs; never loads image blobs.
#[derive(Debug, Clone, FromRow)]
pub struct FoodSummary {
    pub unique_id: String,
    pub food_state: String,
}
