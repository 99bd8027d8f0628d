use argon2::{
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;

use crate::{
    config::HashingConfig,
    error::{AuthError, AuthResult},
};

/// Salted Argon2id hashing for stored passwords.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    // same params as real hashes, so verifying against it costs the same
    dummy: String,
}

impl std::fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl CredentialHasher {
    pub fn new(cfg: &HashingConfig) -> AuthResult<Self> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| AuthError::Config(format!("argon2 params: {e}")))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let salt = SaltString::generate(&mut OsRng);
        let dummy = argon2
            .hash_password(b"northblog-unused-credential", &salt)
            .map_err(|e| AuthError::Config(format!("argon2 dummy hash: {e}")))?
            .to_string();
        Ok(Self { argon2, dummy })
    }

    /// Hash to verify against when no user matched.
    pub fn dummy_hash(&self) -> &str {
        &self.dummy
    }

    /// Returns a PHC string; a new salt is drawn on every call.
    pub fn hash(&self, plain: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| AuthError::internal(anyhow::anyhow!("argon2 hash_password: {e}")))?;
        Ok(hash.to_string())
    }

    /// `Ok(false)` on mismatch. Errors only when `hash` cannot be parsed.
    pub fn verify(&self, hash: &str, plain: &str) -> AuthResult<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::internal(anyhow::anyhow!("argon2 parse hash: {e}")))?;
        match self.argon2.verify_password(plain.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::internal(anyhow::anyhow!("argon2 verify: {e}"))),
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(&HashingConfig {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    })
    .expect("valid test params")
}
