use serde::{Deserialize, Serialize};

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Request body for user login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Signup answer: internal and external ids only.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: i64,
    #[serde(rename = "_id")]
    pub unique_id: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub id: i64,
    #[serde(rename = "_id")]
    pub unique_id: String,
    pub message: &'static str,
}
