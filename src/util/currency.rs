//! Supported currency codes.

pub const USD: &str = "USD";
pub const EUR: &str = "EUR";
pub const IDR: &str = "IDR";

pub fn is_supported_currency(currency: &str) -> bool {
    matches!(currency, USD | EUR | IDR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_currencies() {
        assert!(is_supported_currency("USD"));
        assert!(is_supported_currency("EUR"));
        assert!(is_supported_currency("IDR"));
    }

    #[test]
    fn unsupported_currencies() {
        assert!(!is_supported_currency("usd"));
        assert!(!is_supported_currency("GBP"));
        assert!(!is_supported_currency(""));
    }
}
