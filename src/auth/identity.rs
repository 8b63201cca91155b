use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use uuid::Uuid;

/// Opaque external identifier: hex SHA-256 over the caller's seed, the current
/// time in nanoseconds and a random v4 UUID. 64 lowercase hex chars, URL-safe.
pub fn new_unique_id(seed: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_bytes());
    hasher.update(OffsetDateTime::now_utc().unix_timestamp_nanos().to_be_bytes());
    hasher.update(Uuid::new_v4().as_bytes());
    hex::encode(hasher.finalize())
}

/// Unique ids are hex digests; anything else can't match a record.
pub fn looks_like_unique_id(id: &str) -> bool {
    id.len() == 64 && id.bytes().all(|b| b.is_ascii_hexdigit())
}
