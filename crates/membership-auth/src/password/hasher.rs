//! Argon2id salted password hashing and verification.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher as ArgonHasher, PasswordVerifier, SaltString},
};

use membership_core::config::HashingConfig;
use membership_core::error::AppError;

/// Random bytes per salt.
const SALT_LENGTH: usize = 16;

/// Hashes passwords with Argon2id.
///
/// The hash input is the salt followed by the password, so a given salt and
/// password always produce the same hash. Cost parameters are embedded in
/// every hash; verification uses the stored ones, so raising the cost does
/// not invalidate existing credentials.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    /// Creates a hasher with the configured cost parameters.
    pub fn new(config: &HashingConfig) -> Result<Self, AppError> {
        let params = Params::new(config.memory_kib, config.iterations, config.parallelism, None)
            .map_err(|e| AppError::configuration(format!("Invalid Argon2 parameters: {e}")))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// A fresh random salt, base64 without padding.
    pub fn generate_salt(&self) -> Result<String, AppError> {
        let bytes: [u8; SALT_LENGTH] = rand::random();
        SaltString::encode_b64(&bytes)
            .map(|salt| salt.as_str().to_string())
            .map_err(|e| AppError::internal(format!("Salt encoding failed: {e}")))
    }

    /// Hash `salt ‖ password`.
    pub fn hash(&self, password: &str, salt: &str) -> Result<String, AppError> {
        let salt_string = SaltString::from_b64(salt)
            .map_err(|e| AppError::internal(format!("Invalid password salt: {e}")))?;
        let input = format!("{salt}{password}");

        let hash = self
            .argon2()
            .hash_password(input.as_bytes(), &salt_string)
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

        Ok(hash.to_string())
    }

    /// Verifies a plaintext password against a stored hash and its salt.
    ///
    /// Returns `Ok(true)` if the password matches, `Ok(false)` if not.
    pub fn verify(&self, password: &str, salt: &str, hash: &str) -> Result<bool, AppError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::internal(format!("Invalid password hash format: {e}")))?;
        let input = format!("{salt}{password}");

        match self.argon2().verify_password(input.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AppError::internal(format!(
                "Password verification failed: {e}"
            ))),
        }
    }
}
