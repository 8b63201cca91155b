use std::{io, sync::Arc};

use bytes::Bytes;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::identity::{looks_like_unique_id, new_unique_id},
    config::FoodImageMode,
    error::AppError,
    foods::{
        repo::FoodRepository,
        repo_types::{FoodItem, NewFoodItem},
    },
    images::services::{content_type_for, ext_for, object_key, UploadItem},
    storage::StorageClient,
};

/// Public locator for a food item's image.
pub fn image_uri(unique_id: &str) -> String {
    format!("/api/food/image/{unique_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoodListEntry {
    pub food_state: String,
    pub image_uri: String,
}

/// Owns food item records and the images attached to them.
#[derive(Clone)]
pub struct FoodStore {
    repo: Arc<dyn FoodRepository>,
    storage: Arc<dyn StorageClient>,
    mode: FoodImageMode,
}

impl FoodStore {
    pub fn new(
        repo: Arc<dyn FoodRepository>,
        storage: Arc<dyn StorageClient>,
        mode: FoodImageMode,
    ) -> Self {
        Self {
            repo,
            storage,
            mode,
        }
    }

    #[instrument(skip(self, image))]
    pub async fn add_item(
        &self,
        food_name: &str,
        food_type: &str,
        food_state: &str,
        image: Option<UploadItem>,
    ) -> Result<FoodItem, AppError> {
        let (food_name, food_type, food_state) =
            (food_name.trim(), food_type.trim(), food_state.trim());
        for (field, value) in [
            ("food_name", food_name),
            ("food_type", food_type),
            ("food_state", food_state),
        ] {
            if value.is_empty() {
                return Err(AppError::validation(format!("{field} is required")));
            }
        }

        let image = image.filter(|img| !img.body.is_empty());
        let filename = image
            .as_ref()
            .and_then(|img| img.filename.clone())
            .unwrap_or_else(|| food_name.to_owned());

        let mut new_item = NewFoodItem {
            unique_id: new_unique_id(&filename),
            food_name: food_name.to_owned(),
            food_type: food_type.to_owned(),
            food_state: food_state.to_owned(),
            image_path: None,
            image_data: None,
            image_ext: None,
            created_at: OffsetDateTime::now_utc(),
        };

        if let Some(img) = image {
            let ext = ext_for(&img);
            match self.mode {
                FoodImageMode::File => {
                    let key = object_key(&filename, &ext);
                    self.storage.put_object(&key, img.body).await.map_err(|e| {
                        error!(error = %e, %key, "could not write image");
                        AppError::from(e)
                    })?;
                    new_item.image_path = Some(key);
                }
                FoodImageMode::Inline => {
                    new_item.image_data = Some(img.body.to_vec());
                }
            }
            new_item.image_ext = Some(ext);
        }

        match self.repo.insert(&new_item).await {
            Ok(item) => {
                info!(row = item.id, food_id = %item.unique_id, has_image = item.has_image(), "food item added");
                Ok(item)
            }
            Err(e) => {
                // don't strand the file we just wrote
                if let Some(key) = &new_item.image_path {
                    if let Err(cleanup) = self.storage.delete_object(key).await {
                        warn!(error = %cleanup, %key, "orphaned image after failed insert");
                    }
                }
                Err(e.into())
            }
        }
    }

    pub async fn list_items(&self) -> Result<Vec<FoodListEntry>, AppError> {
        let rows = self.repo.list().await?;
        Ok(rows
            .into_iter()
            .map(|row| FoodListEntry {
                image_uri: image_uri(&row.unique_id),
                food_state: row.food_state,
            })
            .collect())
    }

    async fn find(&self, unique_id: &str) -> Result<FoodItem, AppError> {
        if !looks_like_unique_id(unique_id) {
            return Err(AppError::NotFound("Food item"));
        }
        self.repo
            .find_by_unique_id(unique_id)
            .await?
            .ok_or(AppError::NotFound("Food item"))
    }

    /// Image bytes and their content type. The record and the stored file can
    /// go missing independently; either one is a NotFound.
    #[instrument(skip(self))]
    pub async fn get_image(&self, unique_id: &str) -> Result<(Bytes, String), AppError> {
        let item = self.find(unique_id).await?;
        let content_type = content_type_for(item.image_ext.as_deref().unwrap_or("bin"));

        if let Some(data) = item.image_data {
            return Ok((Bytes::from(data), content_type));
        }
        let Some(key) = item.image_path else {
            return Err(AppError::NotFound("Image"));
        };
        match self.storage.get_object(&key).await {
            Ok(bytes) => Ok((bytes, content_type)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(%key, "image file missing on disk");
                Err(AppError::NotFound("Image"))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the image first. An image that is already gone is fine; any
    /// other removal failure keeps the record.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, unique_id: &str) -> Result<(), AppError> {
        let item = self.find(unique_id).await?;

        if let Some(key) = &item.image_path {
            match self.storage.delete_object(key).await {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(%key, "image already absent");
                }
                Err(e) => {
                    error!(error = %e, %key, "could not delete image file");
                    return Err(e.into());
                }
            }
        }

        if !self.repo.delete(&item.unique_id).await? {
            return Err(AppError::NotFound("Food item"));
        }
        info!(food_id = %item.unique_id, "food item deleted");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) async fn test_food_store(mode: FoodImageMode) -> (FoodStore, tempfile::TempDir) {
    let db = crate::db::test_database().await;
    let dir = tempfile::tempdir().expect("tempdir");
    let storage = crate::storage::LocalStorage::new(dir.path().join("images"))
        .await
        .expect("image dir");
    (FoodStore::new(db.foods(), Arc::new(storage), mode), dir)
}
