//! Password Service
//!
//! Secure password hashing using Argon2id.

use argon2::{
    password_hash::{
        rand_core::OsRng,
        PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
    },
    Argon2,
};
use tracing::warn;

use crate::shared::error::{Result, TrackingError};

/// Minimum accepted password length.
const MIN_PASSWORD_LEN: usize = 8;
/// Maximum accepted password length.
const MAX_PASSWORD_LEN: usize = 128;

/// Password hashing and verification service.
pub struct PasswordService {
    argon2: Argon2<'static>,
}

impl PasswordService {
    pub fn new() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }

    /// Validate a candidate password against the policy.
    pub fn validate_password(&self, password: &str) -> Result<()> {
        if password.len() < MIN_PASSWORD_LEN {
            return Err(TrackingError::validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        if password.len() > MAX_PASSWORD_LEN {
            return Err(TrackingError::validation(format!(
                "Password must be at most {} characters",
                MAX_PASSWORD_LEN
            )));
        }
        Ok(())
    }

    /// Hash a password using Argon2id.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        self.validate_password(password)?;

        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| TrackingError::internal(format!("Failed to hash password: {}", e)))?;

        Ok(hash.to_string())
    }

    /// Verify a password against a stored hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| TrackingError::internal(format!("Invalid password hash format: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => {
                warn!("Password verification failed: incorrect password");
                Ok(false)
            }
            Err(e) => Err(TrackingError::internal(format!(
                "Password verification error: {}",
                e
            ))),
        }
    }
}

impl Default for PasswordService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let service = PasswordService::new();
        let hash = service.hash_password("correct-horse").unwrap();

        assert!(hash.starts_with("$argon2id$"));
        assert!(service.verify_password("correct-horse", &hash).unwrap());
        assert!(!service.verify_password("wrong-horse", &hash).unwrap());
    }

    #[test]
    fn test_policy_rejects_short() {
        let service = PasswordService::new();
        assert!(service.hash_password("short").is_err());
    }

    #[test]
    fn test_hash_uniqueness() {
        let service = PasswordService::new();
        let hash1 = service.hash_password("same-password").unwrap();
        let hash2 = service.hash_password("same-password").unwrap();
        assert_ne!(hash1, hash2);
    }
}
