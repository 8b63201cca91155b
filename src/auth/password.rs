use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::{rngs::OsRng, RngCore};
use tracing::error;

use crate::{config::HashConfig, error::AppError};

/// 128 bits of salt per user.
pub const SALT_LEN: usize = 16;

/// Source of salt bytes. Must fail rather than hand back weak bytes.
pub type EntropySource = fn(&mut [u8]) -> Result<(), rand::Error>;

fn os_entropy(buf: &mut [u8]) -> Result<(), rand::Error> {
    OsRng.try_fill_bytes(buf)
}

/// Salted Argon2id digests. Stores keep `(digest, salt)` side by side and verify
/// by recomputing with the stored salt.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    entropy: EntropySource,
}

impl CredentialHasher {
    pub fn new(cfg: &HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| anyhow::anyhow!("argon2 params: {e}"))?;
        Ok(Self {
            params,
            entropy: os_entropy,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_entropy(mut self, entropy: EntropySource) -> Self {
        self.entropy = entropy;
        self
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Fresh salt from the entropy source (the OS by default), B64 encoded.
    pub fn generate_salt(&self) -> Result<String, AppError> {
        let mut bytes = [0u8; SALT_LEN];
        (self.entropy)(&mut bytes).map_err(|e| {
            error!(error = %e, "entropy source unavailable");
            AppError::RandomnessUnavailable(e)
        })?;
        let salt = SaltString::encode_b64(&bytes).map_err(|e| {
            AppError::Storage(anyhow::anyhow!("salt encoding: {e}"))
        })?;
        Ok(salt.as_str().to_owned())
    }

    /// Deterministic for a given `(password, salt)` and hasher parameters.
    pub fn hash(&self, password: &str, salt: &str) -> Result<String, AppError> {
        let salt = SaltString::from_b64(salt)
            .map_err(|e| AppError::Storage(anyhow::anyhow!("malformed salt: {e}")))?;
        let hash = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                AppError::Storage(anyhow::anyhow!(e.to_string()))
            })?;
        Ok(hash.to_string())
    }

    /// Recomputes the digest of `password` with the stored salt (and the
    /// parameters recorded in `stored`) and compares in constant time.
    pub fn verify(&self, password: &str, salt: &str, stored: &str) -> Result<bool, AppError> {
        let parsed = PasswordHash::new(stored).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            AppError::Storage(anyhow::anyhow!(e.to_string()))
        })?;
        if parsed.salt.map(|s| s.as_str()) != Some(salt) {
            return Ok(false);
        }
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    // minimum cost keeps debug-build tests fast
    CredentialHasher::new(&HashConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid params")
}

#[cfg(test)]
pub(crate) fn no_entropy(_: &mut [u8]) -> Result<(), rand::Error> {
    Err(rand::Error::new(std::io::Error::new(
        std::io::ErrorKind::Other,
        "entropy pool closed",
    )))
}
