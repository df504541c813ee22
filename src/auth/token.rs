//! Signed stateless session tokens (HS256 JWT).

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::AuthUser;
use crate::config::AuthConfig;

/// Claims carried by a session token: identity, role, and its time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// User id
    pub sub: String,
    pub name: String,
    pub email: String,
    pub role: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// Signing and verification keys for session tokens.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    max_age: Duration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], max_age_secs: i64) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            max_age: Duration::seconds(max_age_secs),
        }
    }

    pub fn from_config(config: &AuthConfig) -> Self {
        Self::new(config.session_secret.as_bytes(), config.session_max_age_secs)
    }

    /// Issue a token for a freshly authenticated user.
    pub fn issue(&self, user: &AuthUser) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_at(user, Utc::now())
    }

    pub fn issue_at(
        &self,
        user: &AuthUser,
        now: DateTime<Utc>,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            sub: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
            iat: now.timestamp(),
            exp: (now + self.max_age).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
        decode::<SessionClaims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;
    use serde_json::{Map, Value};
    use std::collections::BTreeSet;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn user() -> AuthUser {
        AuthUser {
            id: "3f1c7a52-0b4e-4a7e-9c1d-5b2f0e6d8a91".to_string(),
            name: "Jane Smith".to_string(),
            email: "jsmith@example.com".to_string(),
            role: "admin".to_string(),
        }
    }

    #[test]
    fn test_issued_token_decodes_to_identity_and_role() {
        let keys = SessionKeys::new(SECRET, 3600);
        let token = keys.issue(&user()).unwrap();
        let claims = keys.verify(&token).unwrap();

        assert_eq!(claims.sub, user().id);
        assert_eq!(claims.name, "Jane Smith");
        assert_eq!(claims.email, "jsmith@example.com");
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_token_carries_exactly_the_session_claims() {
        let keys = SessionKeys::new(SECRET, 3600);
        let token = keys.issue(&user()).unwrap();

        let raw = decode::<Map<String, Value>>(&token, &keys.decoding, &keys.validation)
            .unwrap()
            .claims;
        let names: BTreeSet<&str> = raw.keys().map(String::as_str).collect();
        let expected: BTreeSet<&str> = ["sub", "name", "email", "role", "iat", "exp"]
            .into_iter()
            .collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn test_expired_token_rejected() {
        let keys = SessionKeys::new(SECRET, 60);
        let token = keys
            .issue_at(&user(), Utc::now() - Duration::seconds(120))
            .unwrap();

        let err = keys.verify(&token).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::ExpiredSignature);
    }

    #[test]
    fn test_token_signed_with_other_secret_rejected() {
        let token = SessionKeys::new(b"another-secret-another-secret-00", 3600)
            .issue(&user())
            .unwrap();

        let err = SessionKeys::new(SECRET, 3600).verify(&token).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let keys = SessionKeys::new(SECRET, 3600);
        let token = keys.issue(&user()).unwrap();
        let other = keys
            .issue(&AuthUser {
                role: "superuser".to_string(),
                ..user()
            })
            .unwrap();

        // Splice the other token's payload onto this token's signature
        let parts: Vec<&str> = token.split('.').collect();
        let other_parts: Vec<&str> = other.split('.').collect();
        let forged = format!("{}.{}.{}", parts[0], other_parts[1], parts[2]);

        assert!(keys.verify(&forged).is_err());
    }

    #[test]
    fn test_garbage_rejected() {
        let keys = SessionKeys::new(SECRET, 3600);
        assert!(keys.verify("").is_err());
        assert!(keys.verify("not.a.jwt").is_err());
    }
}
