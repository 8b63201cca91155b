use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date, OffsetDateTime};
use tracing::{debug, info, instrument, warn};

use crate::{
    auth::{
        identity::{looks_like_unique_id, new_unique_id},
        password::CredentialHasher,
    },
    error::{is_unique_violation, AppError},
    images::services::{normalize_to_png_blocking, PNG_EXT},
    users::{
        repo::UserRepository,
        repo_types::{NewUser, ProfileUpdate, User},
    },
};

const MAX_PROFESSION_LEN: usize = 128;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.\-]{1,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Dates of birth come in exactly one format, `YYYY-MM-DD`.
pub fn parse_date_of_birth(raw: &str) -> Result<Date, AppError> {
    Date::parse(raw.trim(), format_description!("[year]-[month]-[day]"))
        .map_err(|_| AppError::InvalidDateFormat)
}

/// Owns user records: signup, login, lookups and single-field profile edits.
#[derive(Clone)]
pub struct AccountStore {
    repo: Arc<dyn UserRepository>,
    hasher: CredentialHasher,
}

impl AccountStore {
    pub fn new(repo: Arc<dyn UserRepository>, hasher: CredentialHasher) -> Self {
        Self { repo, hasher }
    }

    /// The email UNIQUE constraint decides duplicates; there is no pre-check.
    #[instrument(skip(self, name, password))]
    pub async fn create_account(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let name = name.trim();
        let email = normalize_email(email);
        if name.is_empty() {
            return Err(AppError::validation("Name is required"));
        }
        if !is_valid_email(&email) {
            return Err(AppError::validation("Invalid email"));
        }
        if password.is_empty() {
            return Err(AppError::validation("Password is required"));
        }

        let salt = self.hasher.generate_salt()?;
        let password_hash = self.hasher.hash(password, &salt)?;
        let unique_id = new_unique_id(&format!("{name}{salt}"));

        let new_user = NewUser {
            unique_id,
            name: name.to_owned(),
            email,
            password_hash,
            salt,
            created_at: OffsetDateTime::now_utc(),
        };

        match self.repo.insert(&new_user).await {
            Ok(user) => {
                info!(user_id = %user.unique_id, "user registered");
                Ok(user)
            }
            Err(e) if is_unique_violation(&e) => {
                warn!("email already registered");
                Err(AppError::DuplicateEmail)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    #[instrument(skip(self, email, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let email = normalize_email(email);
        let Some(user) = self.repo.find_by_email(&email).await? else {
            warn!("login unknown email");
            return Err(AppError::InvalidCredentials);
        };
        if !self.hasher.verify(password, &user.salt, &user.password_hash)? {
            warn!(user_id = %user.unique_id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        info!(user_id = %user.unique_id, "user logged in");
        Ok(user)
    }

    pub async fn get_by_unique_id(&self, unique_id: &str) -> Result<User, AppError> {
        if !looks_like_unique_id(unique_id) {
            return Err(AppError::NotFound("User"));
        }
        self.repo
            .find_by_unique_id(unique_id)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    async fn apply(&self, unique_id: &str, update: ProfileUpdate) -> Result<User, AppError> {
        self.repo
            .update(unique_id, update)
            .await?
            .ok_or(AppError::NotFound("User"))
    }

    /// Always stored as PNG, whatever was uploaded.
    #[instrument(skip(self, image))]
    pub async fn update_profile_picture(
        &self,
        unique_id: &str,
        image: &[u8],
    ) -> Result<User, AppError> {
        if image.is_empty() {
            return Err(AppError::validation("Invalid file upload"));
        }
        let png = normalize_to_png_blocking(image.to_vec()).await?;
        debug!(bytes_in = image.len(), bytes_out = png.len(), "profile picture normalized");
        self.apply(
            unique_id,
            ProfileUpdate::Picture {
                data: png,
                ext: PNG_EXT.to_owned(),
            },
        )
        .await
    }

    pub async fn profile_picture(&self, unique_id: &str) -> Result<Vec<u8>, AppError> {
        let user = self.get_by_unique_id(unique_id).await?;
        match user.pfp {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(AppError::NotFound("Profile picture")),
        }
    }

    #[instrument(skip(self, profession))]
    pub async fn update_profession(
        &self,
        unique_id: &str,
        profession: &str,
    ) -> Result<User, AppError> {
        let profession = profession.trim();
        if profession.chars().count() > MAX_PROFESSION_LEN {
            return Err(AppError::validation("Profession is too long"));
        }
        self.apply(unique_id, ProfileUpdate::Profession(profession.to_owned()))
            .await
    }

    #[instrument(skip(self))]
    pub async fn update_date_of_birth(&self, unique_id: &str, raw: &str) -> Result<User, AppError> {
        let dob = parse_date_of_birth(raw)?;
        self.apply(unique_id, ProfileUpdate::DateOfBirth(dob)).await
    }

    /// The lookup only short-circuits the common case; the UNIQUE constraint
    /// on `username` settles races.
    #[instrument(skip(self))]
    pub async fn update_username(&self, unique_id: &str, username: &str) -> Result<User, AppError> {
        let username = username.trim();
        if !is_valid_username(username) {
            return Err(AppError::validation(
                "Username must be 1-32 characters of letters, digits, '.', '_' or '-'",
            ));
        }

        let user = self.get_by_unique_id(unique_id).await?;
        if user.username.as_deref() == Some(username) {
            return Ok(user);
        }
        if let Some(holder) = self.repo.find_by_username(username).await? {
            if holder.unique_id != user.unique_id {
                return Err(AppError::UsernameTaken);
            }
        }

        match self
            .repo
            .update(unique_id, ProfileUpdate::Username(username.to_owned()))
            .await
        {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(AppError::NotFound("User")),
            Err(e) if is_unique_violation(&e) => Err(AppError::UsernameTaken),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub(crate) async fn test_account_store() -> AccountStore {
    let db = crate::db::test_database().await;
    AccountStore::new(db.users(), crate::auth::password::test_hasher())
}

#[cfg(test)]
mod tests {
    use image::ImageOutputFormat;
    use time::macros::date;

    use super::*;
    use crate::{error::ErrorKind, images::services::sample_image};

    #[test]
    fn email_and_username_rules() {
        assert!(is_valid_email("ann@x.com"));
        assert!(!is_valid_email("ann"));
        assert!(!is_valid_email("ann @x.com"));
        assert!(is_valid_username("ann_92.b-c"));
        assert!(!is_valid_username(""));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username(&"a".repeat(33)));
    }

    #[test]
    fn dob_uses_one_fixed_format() {
        assert_eq!(parse_date_of_birth("1990-04-01").unwrap(), date!(1990 - 04 - 01));
        for bad in ["01/04/1990", "1990-4-1x", "1990-13-01", ""] {
            assert!(matches!(parse_date_of_birth(bad), Err(AppError::InvalidDateFormat)), "{bad}");
        }
    }

    #[tokio::test]
    async fn create_account_hashes_and_assigns_identity() {
        let store = test_account_store().await;
        let user = store.create_account("Ann", " Ann@X.com ", "secret").await.unwrap();

        assert!(user.id > 0);
        assert_eq!(user.unique_id.len(), 64);
        assert_eq!(user.email, "ann@x.com");
        assert_ne!(user.password_hash, "secret");
        assert!(!user.verify_status);
        assert!(user.username.is_none());
        assert!(store.hasher.verify("secret", &user.salt, &user.password_hash).unwrap());
    }

    #[tokio::test]
    async fn same_password_different_users_different_digests() {
        let store = test_account_store().await;
        let a = store.create_account("A", "a@x.com", "same").await.unwrap();
        let b = store.create_account("B", "b@x.com", "same").await.unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.password_hash, b.password_hash);
        assert_ne!(a.unique_id, b.unique_id);
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict_and_keeps_one_record() {
        let store = test_account_store().await;
        let first = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();
        let err = store
            .create_account("Other Ann", "ANN@x.com", "different")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let found = store.repo.find_by_email("ann@x.com").await.unwrap().unwrap();
        assert_eq!(found.unique_id, first.unique_id);
        assert_eq!(found.name, "Ann");
    }

    #[tokio::test]
    async fn create_account_validates_input() {
        let store = test_account_store().await;
        for (name, email, pw) in [("", "a@x.com", "pw"), ("A", "nope", "pw"), ("A", "a@x.com", "")] {
            let err = store.create_account(name, email, pw).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn signup_aborts_when_entropy_is_unavailable() {
        let db = crate::db::test_database().await;
        let hasher = crate::auth::password::test_hasher()
            .with_entropy(crate::auth::password::no_entropy);
        let store = AccountStore::new(db.users(), hasher);

        let err = store.create_account("Ann", "ann@x.com", "secret").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RandomnessUnavailable);
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert!(store.repo.find_by_email("ann@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn authenticate_succeeds_only_with_matching_hash() {
        let store = test_account_store().await;
        let created = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();

        let user = store.authenticate("ann@x.com", "secret").await.unwrap();
        assert_eq!(user.unique_id, created.unique_id);

        let wrong = store.authenticate("ann@x.com", "Secret").await.unwrap_err();
        let unknown = store.authenticate("bob@x.com", "secret").await.unwrap_err();
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert_eq!(wrong.to_string(), unknown.to_string());
    }

    #[tokio::test]
    async fn unknown_unique_id_is_not_found() {
        let store = test_account_store().await;
        let err = store.get_by_unique_id("deadbeef").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = store.update_profession("deadbeef", "chef").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = store.get_by_unique_id(&"a".repeat(64)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn profile_fields_update_one_at_a_time() {
        let store = test_account_store().await;
        let user = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();

        let updated = store.update_profession(&user.unique_id, " Chef ").await.unwrap();
        assert_eq!(updated.profession.as_deref(), Some("Chef"));

        let updated = store
            .update_date_of_birth(&user.unique_id, "1990-04-01")
            .await
            .unwrap();
        assert_eq!(updated.date_of_birth, Some(date!(1990 - 04 - 01)));
        assert_eq!(updated.profession.as_deref(), Some("Chef"));

        let err = store
            .update_date_of_birth(&user.unique_id, "April 1st")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDateFormat));
        let again = store.get_by_unique_id(&user.unique_id).await.unwrap();
        assert_eq!(again.date_of_birth, Some(date!(1990 - 04 - 01)));
        assert_eq!(again.created_at, user.created_at);
    }

    #[tokio::test]
    async fn taken_username_is_a_conflict_and_leaves_original() {
        let store = test_account_store().await;
        let ann = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();
        let bob = store.create_account("Bob", "bob@x.com", "secret").await.unwrap();

        store.update_username(&ann.unique_id, "ann").await.unwrap();
        store.update_username(&bob.unique_id, "bob").await.unwrap();

        let err = store.update_username(&bob.unique_id, "ann").await.unwrap_err();
        assert!(matches!(err, AppError::UsernameTaken));
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let bob = store.get_by_unique_id(&bob.unique_id).await.unwrap();
        assert_eq!(bob.username.as_deref(), Some("bob"));

        // re-setting your own username is fine
        let ann = store.update_username(&ann.unique_id, "ann").await.unwrap();
        assert_eq!(ann.username.as_deref(), Some("ann"));
    }

    #[tokio::test]
    async fn unique_constraint_backs_the_username_precheck() {
        let store = test_account_store().await;
        let ann = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();
        let bob = store.create_account("Bob", "bob@x.com", "secret").await.unwrap();
        store.update_username(&ann.unique_id, "taken").await.unwrap();

        // bypass the pre-check, as a racing request would
        let err = store
            .repo
            .update(&bob.unique_id, ProfileUpdate::Username("taken".into()))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&err));
    }

    #[tokio::test]
    async fn profile_picture_is_stored_as_png() {
        let store = test_account_store().await;
        let user = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();

        let err = store.profile_picture(&user.unique_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let jpeg = sample_image(ImageOutputFormat::Jpeg(90));
        let updated = store
            .update_profile_picture(&user.unique_id, &jpeg)
            .await
            .unwrap();
        assert_eq!(updated.pfp_ext.as_deref(), Some("png"));

        let stored = store.profile_picture(&user.unique_id).await.unwrap();
        assert!(stored.starts_with(b"\x89PNG"));
        assert_eq!(image::guess_format(&stored).unwrap(), image::ImageFormat::Png);
    }

    #[tokio::test]
    async fn bogus_profile_picture_is_rejected() {
        let store = test_account_store().await;
        let user = store.create_account("Ann", "ann@x.com", "secret").await.unwrap();
        let err = store
            .update_profile_picture(&user.unique_id, b"GIF89a but not really")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
