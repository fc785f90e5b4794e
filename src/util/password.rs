//! Argon2 password hashing.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("stored password hash is malformed: {0}")]
    InvalidHash(String),

    #[error("password does not match")]
    Mismatch,
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::Hash(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored argon2 hash.
pub fn verify_password(password: &str, hashed: &str) -> Result<(), PasswordError> {
    let parsed = PasswordHash::new(hashed).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| PasswordError::Mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::random::random_string;

    #[test]
    fn hash_and_verify() {
        let password = random_string(8);
        let hashed = hash_password(&password).unwrap();
        assert_ne!(password, hashed);
        verify_password(&password, &hashed).unwrap();
    }

    #[test]
    fn wrong_password_rejected() {
        let hashed = hash_password("correct-horse").unwrap();
        let err = verify_password("battery-staple", &hashed).unwrap_err();
        assert!(matches!(err, PasswordError::Mismatch));
    }

    #[test]
    fn same_password_different_salts() {
        let password = random_string(8);
        let first = hash_password(&password).unwrap();
        let second = hash_password(&password).unwrap();
        assert_ne!(first, second);
        verify_password(&password, &second).unwrap();
    }

    #[test]
    fn malformed_hash_rejected() {
        let err = verify_password("anything", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, PasswordError::InvalidHash(_)));
    }
}
