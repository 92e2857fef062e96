//! # Password Hashing
//!
//! Argon2id with a fresh random salt per password and an optional
//! store-wide secret ("pepper") from configuration.
//!
//! Hashing is CPU and memory heavy, so both directions run on tokio's
//! blocking pool instead of an executor thread.

use std::fmt;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::OsRng;

use crate::error::{StoreError, StoreResult};

/// A derived password: the B64 salt and the full PHC string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashedPassword {
    pub salt: String,
    pub hash: String,
}

/// Derives and checks password hashes with the configured cost.
#[derive(Clone)]
pub struct CredentialHasher {
    secret: Option<Arc<[u8]>>,
    params: Params,
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("peppered", &self.secret.is_some())
            .field("m_cost", &self.params.m_cost())
            .field("t_cost", &self.params.t_cost())
            .field("p_cost", &self.params.p_cost())
            .finish()
    }
}

impl CredentialHasher {
    /// Creates a hasher. Fails with `Config` on invalid Argon2 parameters.
    pub fn new(
        pepper: Option<&str>,
        memory_kib: u32,
        iterations: u32,
        parallelism: u32,
    ) -> StoreResult<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| StoreError::Config(format!("invalid argon2 parameters: {e}")))?;
        let secret = pepper
            .filter(|p| !p.is_empty())
            .map(|p| Arc::<[u8]>::from(p.as_bytes()));
        Ok(CredentialHasher { secret, params })
    }

    fn argon2(&self) -> StoreResult<Argon2<'_>> {
        match &self.secret {
            Some(secret) => Argon2::new_with_secret(
                secret,
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )
            .map_err(|e| StoreError::Hashing(e.to_string())),
            None => Ok(Argon2::new(
                Algorithm::Argon2id,
                Version::V0x13,
                self.params.clone(),
            )),
        }
    }

    fn hash_blocking(&self, password: &str) -> StoreResult<HashedPassword> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| StoreError::Hashing(format!("failed to hash password: {e}")))?
            .to_string();
        Ok(HashedPassword {
            salt: salt.as_str().to_string(),
            hash,
        })
    }

    fn verify_blocking(&self, password: &str, stored: &str) -> StoreResult<bool> {
        let parsed = PasswordHash::new(stored)
            .map_err(|e| StoreError::Hashing(format!("stored hash is unreadable: {e}")))?;
        Ok(self
            .argon2()?
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    /// Hashes a new password with a fresh salt.
    pub async fn hash(&self, password: &str) -> StoreResult<HashedPassword> {
        let hasher = self.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&password))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?
    }

    /// Checks `password` against a stored PHC string in constant time.
    pub async fn verify(&self, password: &str, stored: &str) -> StoreResult<bool> {
        let hasher = self.clone();
        let password = password.to_string();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&password, &stored))
            .await
            .map_err(|e| StoreError::Hashing(e.to_string()))?
    }

    /// Spends the same work as a verification without any stored hash.
    ///
    /// Used for unknown usernames so response time does not reveal which
    /// usernames exist.
    pub async fn equalize_timing(&self, password: &str) {
        if self.hash(password).await.is_err() {
            tracing::debug!("Dummy hash failed");
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
