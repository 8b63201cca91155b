use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::foods::{
    repo_types::FoodItem,
    services::{image_uri, FoodListEntry},
};

/// JSON flavour of `POST /api/food/add`; the image travels base64 encoded.
#[derive(Debug, Deserialize)]
pub struct AddFoodRequest {
    pub food_name: String,
    pub food_type: String,
    pub food_state: String,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub image_filename: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FoodDetails {
    #[serde(rename = "_id")]
    pub unique_id: String,
    pub food_name: String,
    pub food_type: String,
    pub food_state: String,
    pub image_uri: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<FoodItem> for FoodDetails {
    fn from(item: FoodItem) -> Self {
        Self {
            image_uri: item.has_image().then(|| image_uri(&item.unique_id)),
            unique_id: item.unique_id,
            food_name: item.food_name,
            food_type: item.food_type,
            food_state: item.food_state,
            created_at: item.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct FoodListItem {
    pub food_state: String,
    pub image_uri: String,
}

impl From<FoodListEntry> for FoodListItem {
    fn from(e: FoodListEntry) -> Self {
        Self {
            food_state: e.food_state,
            image_uri: e.image_uri,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}
