//! Random value generators for secret codes and test data.

use rand::Rng;
use rand::distributions::Alphanumeric;

use crate::util::currency;

/// Random alphanumeric string of length `n`.
pub fn random_string(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

/// Random lowercase owner/user name.
pub fn random_owner() -> String {
    random_string(8).to_lowercase()
}

/// Random balance in minor units.
pub fn random_money() -> i64 {
    rand::thread_rng().gen_range(0..1_000)
}

pub fn random_email() -> String {
    format!("{}@example.com", random_owner())
}

pub fn random_currency() -> &'static str {
    let options = [currency::USD, currency::EUR, currency::IDR];
    options[rand::thread_rng().gen_range(0..options.len())]
}
