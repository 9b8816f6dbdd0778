use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::types::RoleId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Fully qualified role id, e.g. `cucumber:user:alice`
    pub sub: String,
    pub account: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(role: &RoleId, expiry_hours: u64) -> Self {
        let now = Utc::now();
        let exp = (now + Duration::hours(expiry_hours as i64)).timestamp();

        Self {
            sub: role.to_string(),
            account: role.account.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("JWT generation error: {0}")]
    TokenGeneration(String),
    #[error("Invalid JWT token: {0}")]
    InvalidToken(String),
    #[error("Invalid JWT secret")]
    InvalidSecret,
}

pub fn generate_jwt(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::default(), claims, &encoding_key)
        .map_err(|e| JwtError::TokenGeneration(e.to_string()))
}

pub fn validate_jwt(token: &str, secret: &str) -> Result<Claims, JwtError> {
    if secret.is_empty() {
        return Err(JwtError::InvalidSecret);
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());

    decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|e| JwtError::InvalidToken(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trips_the_role() {
        let role = RoleId::new("cucumber", "user", "alice");
        let token = generate_jwt(&Claims::new(&role, 1), "s3cret").unwrap();

        let claims = validate_jwt(&token, "s3cret").unwrap();
        assert_eq!(claims.sub, "cucumber:user:alice");
        assert_eq!(claims.account, "cucumber");
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let role = RoleId::admin_of("cucumber");
        let token = generate_jwt(&Claims::new(&role, 1), "one").unwrap();
        assert!(matches!(validate_jwt(&token, "two"), Err(JwtError::InvalidToken(_))));
        assert!(matches!(validate_jwt(&token, ""), Err(JwtError::InvalidSecret)));
    }
}
