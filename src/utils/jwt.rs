use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Account username
    pub superuser: bool,
    pub exp: usize, // Expiration timestamp
}

/// Signing material for bearer tokens, built once from configuration and
/// shared through app data.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn generate_token(
        &self,
        username: &str,
        superuser: bool,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let expiration = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
            .timestamp()
            .max(0) as usize;

        let claims = Claims {
            sub: username.to_string(),
            superuser,
            exp: expiration,
        };

        encode(&Header::default(), &claims, &self.encoding)
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        decode::<Claims>(token, &self.decoding, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_validates() {
        let keys = JwtKeys::new("secret", Duration::hours(1));
        let token = keys.generate_token("admin", true).unwrap();
        let claims = keys.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "admin");
        assert!(claims.superuser);
    }

    #[test]
    fn token_from_another_secret_is_rejected() {
        let token = JwtKeys::new("one", Duration::hours(1))
            .generate_token("admin", true)
            .unwrap();
        assert!(JwtKeys::new("two", Duration::hours(1))
            .validate_token(&token)
            .is_err());
    }

    #[test]
    fn oversized_lifetime_saturates_instead_of_panicking() {
        let keys = JwtKeys::new("secret", Duration::MAX);
        let token = keys.generate_token("admin", true).unwrap();
        assert!(keys.validate_token(&token).unwrap().exp > 0);
    }

    #[test]
    fn expired_token_is_rejected() {
        let keys = JwtKeys::new("secret", Duration::hours(-2));
        let token = keys.generate_token("admin", true).unwrap();
        assert!(keys.validate_token(&token).is_err());
    }
}
