use sqlx::FromRow;
use time::{Date, OffsetDateTime};

/// User record in the database.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,                           // sequential, database-assigned
    pub unique_id: String,                 // external identifier
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub password_hash: String,             // Argon2 PHC string, never exposed
    pub salt: String,                      // never exposed
    pub verify_status: bool,
    pub pfp: Option<Vec<u8>>,              // always PNG
    pub pfp_ext: Option<String>,
    pub profession: Option<String>,
    pub date_of_birth: Option<Date>,
    pub created_at: OffsetDateTime,
}

/// Everything the store decides before the row exists.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub unique_id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub salt: String,
    pub created_at: OffsetDateTime,
}

/// A single-field profile mutation, applied as one UPDATE.
#[derive(Debug, Clone)]
pub enum ProfileUpdate {
    Picture { data: Vec<u8>, ext: String },
    Profession(String),
    DateOfBirth(Date),
    Username(String),
}
