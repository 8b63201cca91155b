use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, Multipart, Path, State,
    },
    http::header,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use tracing::{instrument, warn};

use crate::{
    error::AppError,
    images::services::PNG_CONTENT_TYPE,
    state::AppState,
    users::dto::{
        DateOfBirthUpdated, PfpUpdated, ProfessionUpdated, UpdateDateOfBirthRequest,
        UpdateProfessionRequest, UpdateUsernameRequest, UserDetails, UsernameUpdated,
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/api/user/:_id", get(get_user))
        .route("/api/user/:_id/pfp", put(update_pfp))
        .route("/api/user/image/:_id", get(get_pfp))
        .route("/api/user/:_id/profession", put(update_profession))
        .route("/api/user/:_id/dob", put(update_dob))
        .route("/api/user/:_id/username", put(update_username))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserDetails>, AppError> {
    let user = state.accounts.get_by_unique_id(&id).await?;
    Ok(Json(user.into()))
}

/// PUT multipart with a `pfp` file field.
#[instrument(skip(state, mp))]
pub async fn update_pfp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    mp: Result<Multipart, MultipartRejection>,
) -> Result<Json<PfpUpdated>, AppError> {
    let mut mp = mp?;
    let mut image = None;
    while let Some(field) = mp.next_field().await? {
        if field.name() == Some("pfp") {
            image = Some(field.bytes().await?);
        }
    }
    let Some(image) = image else {
        warn!("pfp field missing");
        return Err(AppError::validation("Invalid file upload"));
    };

    let user = state.accounts.update_profile_picture(&id, &image).await?;
    Ok(Json(PfpUpdated {
        message: "Profile picture updated successfully",
        pfp_ext: user.pfp_ext.unwrap_or_default(),
    }))
}

#[instrument(skip(state))]
pub async fn get_pfp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bytes = state.accounts.profile_picture(&id).await?;
    Ok(([(header::CONTENT_TYPE, PNG_CONTENT_TYPE)], bytes))
}

#[instrument(skip(state, payload))]
pub async fn update_profession(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProfessionRequest>, JsonRejection>,
) -> Result<Json<ProfessionUpdated>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .accounts
        .update_profession(&id, &payload.profession)
        .await?;
    Ok(Json(ProfessionUpdated {
        message: "Profession updated successfully",
        profession: user.profession,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_dob(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDateOfBirthRequest>, JsonRejection>,
) -> Result<Json<DateOfBirthUpdated>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .accounts
        .update_date_of_birth(&id, &payload.date_of_birth)
        .await?;
    Ok(Json(DateOfBirthUpdated {
        message: "Date of birth updated successfully",
        date_of_birth: user.date_of_birth,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_username(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUsernameRequest>, JsonRejection>,
) -> Result<Json<UsernameUpdated>, AppError> {
    let Json(payload) = payload?;
    let user = state
        .accounts
        .update_username(&id, &payload.username)
        .await?;
    Ok(Json(UsernameUpdated {
        message: "Username updated successfully",
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use image::ImageOutputFormat;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{app::build_app, images::services::sample_image};

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    fn json_req(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn signup(app: &Router, name: &str, email: &str) -> String {
        let (status, body) = send(
            app,
            json_req(
                "POST",
                "/signup",
                json!({"name": name, "email": email, "password": "secret"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let v: Value = serde_json::from_slice(&body).unwrap();
        v["_id"].as_str().unwrap().to_owned()
    }

    #[tokio::test]
    async fn user_projection_hides_credentials() {
        let (state, _dir) = AppState::fake().await;
        let app = build_app(state);
        let id = signup(&app, "Ann", "ann@x.com").await;

        let (status, body) = send(
            &app,
            Request::get(format!("/api/user/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["name"], "Ann");
        assert_eq!(v["_id"], id.as_str());
        assert_eq!(v["verify_status"], false);
        let obj = v.as_object().unwrap();
        assert!(!obj.contains_key("password"));
        assert!(!obj.contains_key("password_hash"));
        assert!(!obj.contains_key("salt"));
        assert!(!obj.contains_key("pfp"));
        assert!(!obj.contains_key("id"));
    }

    #[tokio::test]
    async fn unknown_user_is_404() {
        let (state, _dir) = AppState::fake().await;
        let app = build_app(state);
        let (status, _) = send(
            &app,
            Request::get("/api/user/nope").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn single_field_updates() {
        let (state, _dir) = AppState::fake().await;
        let app = build_app(state);
        let id = signup(&app, "Ann", "ann@x.com").await;

        let (status, body) = send(
            &app,
            json_req(
                "PUT",
                &format!("/api/user/{id}/profession"),
                json!({"profession": "Chef"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["profession"], "Chef");

        let (status, body) = send(
            &app,
            json_req(
                "PUT",
                &format!("/api/user/{id}/dob"),
                json!({"date_of_birth": "1990-04-01"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["date_of_birth"], "1990-04-01");

        let (status, _) = send(
            &app,
            json_req(
                "PUT",
                &format!("/api/user/{id}/dob"),
                json!({"date_of_birth": "01.04.1990"}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, body) = send(
            &app,
            Request::get(format!("/api/user/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["profession"], "Chef");
        assert_eq!(v["date_of_birth"], "1990-04-01");
    }

    #[tokio::test]
    async fn username_conflict_is_409() {
        let (state, _dir) = AppState::fake().await;
        let app = build_app(state);
        let ann = signup(&app, "Ann", "ann@x.com").await;
        let bob = signup(&app, "Bob", "bob@x.com").await;

        let (status, _) = send(
            &app,
            json_req("PUT", &format!("/api/user/{ann}/username"), json!({"username": "ann"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = send(
            &app,
            json_req("PUT", &format!("/api/user/{bob}/username"), json!({"username": "ann"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["error"], "Username already taken");

        let (_, body) = send(
            &app,
            Request::get(format!("/api/user/{bob}")).body(Body::empty()).unwrap(),
        )
        .await;
        let v: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(v["username"], Value::Null);
    }

    #[tokio::test]
    async fn pfp_upload_is_served_back_as_png() {
        let (state, _dir) = AppState::fake().await;
        let app = build_app(state);
        let id = signup(&app, "Ann", "ann@x.com").await;

        let (status, _) = send(
            &app,
            Request::get(format!("/api/user/image/{id}")).body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let jpeg = sample_image(ImageOutputFormat::Jpeg(85));
        let boundary = "XBOUNDARYX";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"pfp\"; filename=\"me.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(&jpeg);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let (status, resp) = send(
            &app,
            Request::put(format!("/api/user/{id}/pfp"))
                .header(
                    header::CONTENT_TYPE,
                    format!("multipart/form-data; boundary={boundary}"),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let v: Value = serde_json::from_slice(&resp).unwrap();
        assert_eq!(v["pfp_ext"], "png");

        let resp = app
            .clone()
            .oneshot(
                Request::get(format!("/api/user/image/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()[header::CONTENT_TYPE], "image/png");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert!(bytes.starts_with(b"\x89PNG"));
    }
}
