use axum::{
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use bytes::Bytes;
use mime_guess::Mime;
use tracing::{instrument, warn};

use crate::{
    error::AppError,
    foods::dto::{AddFoodRequest, FoodDetails, FoodListItem, Message},
    images::services::UploadItem,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/food", get(list_food))
        .route("/api/food/image/:id", get(get_food_image))
        .route("/api/food/add", post(add_food))
        .route("/api/food/delete/:id", delete(delete_food))
}

fn is_multipart_form(content_type: &str) -> bool {
    content_type
        .parse::<Mime>()
        .is_ok_and(|m| m.essence_str() == "multipart/form-data")
}

#[derive(Debug, Default)]
struct FoodForm {
    food_name: String,
    food_type: String,
    food_state: String,
    image: Option<UploadItem>,
}

async fn read_multipart(mut mp: Multipart) -> Result<FoodForm, AppError> {
    let mut form = FoodForm::default();
    while let Some(field) = mp.next_field().await? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "food_name" => form.food_name = field.text().await?,
            "food_type" => form.food_type = field.text().await?,
            "food_state" => form.food_state = field.text().await?,
            "image" => {
                let filename = field.file_name().map(str::to_owned);
                let content_type = field.content_type().map(str::to_owned);
                let body = field.bytes().await?;
                form.image = Some(UploadItem {
                    body,
                    filename,
                    content_type,
                });
            }
            other => warn!(field = other, "ignoring unknown form field"),
        }
    }
    Ok(form)
}

fn read_json(body: AddFoodRequest) -> Result<FoodForm, AppError> {
    let image = match body.image_base64 {
        Some(b64) => {
            let bytes = STANDARD
                .decode(b64.trim())
                .map_err(|_| AppError::validation("invalid base64 image"))?;
            Some(UploadItem {
                body: Bytes::from(bytes),
                filename: body.image_filename,
                content_type: None,
            })
        }
        None => None,
    };
    Ok(FoodForm {
        food_name: body.food_name,
        food_type: body.food_type,
        food_state: body.food_state,
        image,
    })
}

/// POST /api/food/add, either multipart (`food_name`, `food_type`,
/// `food_state`, file `image`) or JSON with an optional `image_base64`.
#[instrument(skip(state, req))]
pub async fn add_food(
    State(state): State<AppState>,
    req: Request,
) -> Result<(StatusCode, Json<FoodDetails>), AppError> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(is_multipart_form);

    let form = if is_multipart {
        let mp = Multipart::from_request(req, &state).await?;
        read_multipart(mp).await?
    } else {
        let Json(body) = Json::<AddFoodRequest>::from_request(req, &state).await?;
        read_json(body)?
    };

    let item = state
        .foods
        .add_item(&form.food_name, &form.food_type, &form.food_state, form.image)
        .await?;
    Ok((StatusCode::CREATED, Json(item.into())))
}

#[instrument(skip(state))]
pub async fn list_food(State(state): State<AppState>) -> Result<Json<Vec<FoodListItem>>, AppError> {
    let items = state.foods.list_items().await?;
    Ok(Json(items.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_food_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let (bytes, content_type) = state.foods.get_image(&id).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[instrument(skip(state))]
pub async fn delete_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Message>, AppError> {
    state.foods.delete_item(&id).await?;
    Ok(Json(Message {
        message: "Food item deleted successfully",
    }))
}
