//! Password hashing and verification using Argon2id

use crate::{config::SecurityConfig, error::AppError};
use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
    },
    Algorithm, Argon2, Params, Version,
};
use once_cell::sync::OnceCell;

/// Plaintext used to build the dummy hash for unknown-user logins.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing-equalization";

/// Password hasher with configurable parameters
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    dummy_hash: OnceCell<String>,
}

impl PasswordHasher {
    /// Create hasher with default parameters (OWASP recommended: m=19MiB, t=2, p=1)
    pub fn new() -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, Params::default()),
            dummy_hash: OnceCell::new(),
        }
    }

    /// Create hasher with explicit Argon2id cost parameters
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, AppError> {
        let params = Params::new(memory_kib, iterations, parallelism, None).map_err(|e| {
            AppError::Config(format!("Invalid Argon2 params: {}", e))
        })?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            dummy_hash: OnceCell::new(),
        })
    }

    /// Create hasher from the security section of the config
    pub fn from_config(config: &SecurityConfig) -> Result<Self, AppError> {
        Self::with_params(
            config.argon2_memory_kib,
            config.argon2_iterations,
            config.argon2_parallelism,
        )
    }

    /// Hash a password. The random salt and cost parameters are embedded in
    /// the returned PHC string.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| {
                tracing::error!("Failed to hash password: {:?}", e);
                AppError::Internal(format!("Failed to hash password: {}", e))
            })?
            .to_string();

        Ok(password_hash)
    }

    /// Verify a password against a stored hash.
    ///
    /// A stored hash that cannot be parsed verifies as `false`.
    pub fn verify(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!("Failed to parse password hash: {:?}", e);
                return false;
            }
        };

        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    /// Run a full verification against a throwaway hash so that a login for
    /// an unknown account costs the same as a wrong password. Always `false`.
    pub fn verify_dummy(&self, password: &str) -> bool {
        match self.dummy_hash.get_or_try_init(|| self.hash(DUMMY_PASSWORD)) {
            Ok(hash) => {
                let _ = self.verify(password, hash);
            }
            Err(e) => tracing::warn!(error = %e, "Failed to build dummy password hash"),
        }
        false
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}
