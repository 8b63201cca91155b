use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::users::repo_types::User;

time::serde::format_description!(dob_format, Date, "[year]-[month]-[day]");

/// Public projection of a user. Credentials and picture bytes stay inside.
#[derive(Debug, Serialize)]
pub struct UserDetails {
    #[serde(rename = "_id")]
    pub unique_id: String,
    pub name: String,
    pub email: String,
    pub username: Option<String>,
    pub profession: Option<String>,
    #[serde(with = "dob_format::option")]
    pub date_of_birth: Option<Date>,
    pub verify_status: bool,
    pub pfp_ext: Option<String>,
    pub pfp_uri: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for UserDetails {
    fn from(u: User) -> Self {
        let has_pfp = u.pfp.as_ref().is_some_and(|p| !p.is_empty());
        Self {
            pfp_uri: has_pfp.then(|| format!("/api/user/image/{}", u.unique_id)),
            unique_id: u.unique_id,
            name: u.name,
            email: u.email,
            username: u.username,
            profession: u.profession,
            date_of_birth: u.date_of_birth,
            verify_status: u.verify_status,
            pfp_ext: u.pfp_ext,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfessionRequest {
    pub profession: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDateOfBirthRequest {
    pub date_of_birth: String, // YYYY-MM-DD
}

#[derive(Debug, Deserialize)]
pub struct UpdateUsernameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct PfpUpdated {
    pub message: &'static str,
    pub pfp_ext: String,
}

#[derive(Debug, Serialize)]
pub struct ProfessionUpdated {
    pub message: &'static str,
    pub profession: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DateOfBirthUpdated {
    pub message: &'static str,
    #[serde(with = "dob_format::option")]
    pub date_of_birth: Option<Date>,
}

#[derive(Debug, Serialize)]
pub struct UsernameUpdated {
    pub message: &'static str,
    pub username: Option<String>,
}
