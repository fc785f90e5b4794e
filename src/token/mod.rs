//! JWT issuance and verification for access and refresh tokens.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Claims carried by every token. `jti` doubles as the session id for
/// refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub jti: Uuid,
    /// Username the token was issued to.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token is expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,

    #[error("failed to sign token: {0}")]
    Sign(jsonwebtoken::errors::Error),
}

pub struct TokenMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenMaker {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Issue an HS256 token for `username` valid for `ttl`.
    pub fn create_token(&self, username: &str, ttl: Duration) -> Result<(String, Claims), TokenError> {
        let now = Utc::now();
        let claims = Claims {
            jti: Uuid::new_v4(),
            sub: username.to_string(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Sign)?;
        Ok((token, claims))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;
        Ok(data.claims)
    }
}
