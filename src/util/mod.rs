//! Shared helpers: password hashing, currency codes, random generators.

pub mod currency;
pub mod password;
pub mod random;

pub use currency::is_supported_currency;
pub use password::{PasswordError, hash_password, verify_password};
