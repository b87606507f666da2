//! Bearer-token issuance and validation.

use chrono::{Duration, Utc};
use common::UserId;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{AuthError, Result};

/// Lifetime of an issued token, in hours.
pub const TOKEN_LIFETIME_HOURS: i64 = 48;

/// JWT claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Signs and verifies HS256 tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &str) -> Self {
        Self::with_lifetime(secret, Duration::hours(TOKEN_LIFETIME_HOURS))
    }

    pub fn with_lifetime(secret: &str, lifetime: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            lifetime,
        }
    }

    /// Issues a token for a user.
    pub fn issue(&self, user_id: UserId) -> Result<String> {
        let now = Utc::now();
        let claims = Claims {
            user_id,
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };

        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    /// Verifies signature, algorithm and expiry, and returns the claims.
    pub fn validate(&self, token: &str) -> Result<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::InvalidToken
            })
    }
}

/// Extracts the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated parts, the first being
/// `Bearer`.
pub fn extract_bearer_token(header: &str) -> Option<&str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issue_then_validate() {
        let issuer = TokenIssuer::new("test-secret");
        let token = issuer.issue(UserId::new(7)).unwrap();

        let claims = issuer.validate(&token).unwrap();
        assert_eq!(claims.user_id, UserId::new(7));
        assert_eq!(claims.exp - claims.iat, 48 * 3600);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = TokenIssuer::new("one").issue(UserId::new(1)).unwrap();
        let result = TokenIssuer::new("two").validate(&token);
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[test]
    fn expired_token_is_rejected() {
        let issuer = TokenIssuer::with_lifetime("test-secret", Duration::seconds(-10));
        let token = issuer.issue(UserId::new(1)).unwrap();
        assert!(matches!(issuer.validate(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn other_algorithm_is_rejected() {
        let claims = Claims {
            user_id: UserId::new(1),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        let issuer = TokenIssuer::new("test-secret");
        assert!(matches!(issuer.validate(&token), Err(AuthError::InvalidToken)));
    }

    #[test]
    fn garbage_is_rejected() {
        let issuer = TokenIssuer::new("test-secret");
        assert!(issuer.validate("not.a.jwt").is_err());
        assert!(issuer.validate("").is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(extract_bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(extract_bearer_token("bearer abc"), None);
        assert_eq!(extract_bearer_token("Bearer"), None);
        assert_eq!(extract_bearer_token("Bearer "), None);
        assert_eq!(extract_bearer_token("Bearer abc def"), None);
        assert_eq!(extract_bearer_token("Token abc"), None);
        assert_eq!(extract_bearer_token(""), None);
    }
}
