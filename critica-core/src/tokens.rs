//! Confirmation codes and access tokens.
//!
//! Confirmation codes are HMAC-SHA256 values derived from the user's
//! current state rather than stored secrets: any profile mutation bumps
//! `updated_at` and thereby invalidates every outstanding code. Access
//! tokens are HS256 JWTs carrying the user id.

use chrono::Utc;
use hmac::{Hmac, Mac};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::user::User;

type HmacSha256 = Hmac<Sha256>;

/// Hex length 20, the width of the legacy confirmation-code field.
const CODE_BYTES: usize = 10;

/// Derives and checks confirmation codes bound to a user's state.
#[derive(Clone)]
pub struct ConfirmationCodes {
    secret: Vec<u8>,
}

impl ConfirmationCodes {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// The code for the user's current state. Deterministic until the user
    /// record changes.
    pub fn code_for(&self, user: &User) -> String {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(user.id.as_bytes());
        mac.update(user.username.as_bytes());
        mac.update(user.email.as_bytes());
        mac.update(&user.updated_at.timestamp_micros().to_le_bytes());
        let digest = mac.finalize().into_bytes();
        hex::encode(&digest[..CODE_BYTES])
    }

    /// Constant-time check of a submitted code against the user's state.
    pub fn verify(&self, user: &User, code: &str) -> bool {
        let expected = self.code_for(user);
        constant_time_eq::constant_time_eq(expected.as_bytes(), code.as_bytes())
    }
}

impl std::fmt::Debug for ConfirmationCodes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationCodes").finish_non_exhaustive()
    }
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID.
    pub sub: Uuid,
    /// Issued at.
    pub iat: i64,
    /// Expiration time.
    pub exp: i64,
}

/// Signs and verifies bearer access tokens.
#[derive(Clone)]
pub struct AccessTokens {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl AccessTokens {
    pub fn new(secret: &[u8], ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_secs,
        }
    }

    /// Issue a signed token for a confirmed identity.
    pub fn issue(&self, user_id: Uuid) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + self.ttl_secs,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|err| CoreError::internal(format!("failed to sign token: {err}")))
    }

    /// Verify a bearer token and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        jsonwebtoken::decode::<Claims>(
            token,
            &self.decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map(|data| data.claims)
        .map_err(|_| CoreError::Unauthorized("invalid or expired token".to_string()))
    }
}

impl std::fmt::Debug for AccessTokens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessTokens")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::role::Role;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            role: Role::User,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn code_is_deterministic_for_unchanged_state() {
        let codes = ConfirmationCodes::new(b"secret".to_vec());
        let user = sample_user();
        let first = codes.code_for(&user);
        assert_eq!(first, codes.code_for(&user));
        assert_eq!(first.len(), 20);
        assert!(codes.verify(&user, &first));
    }

    #[test]
    fn state_change_invalidates_code() {
        let codes = ConfirmationCodes::new(b"secret".to_vec());
        let mut user = sample_user();
        let code = codes.code_for(&user);

        user.updated_at += Duration::seconds(1);
        assert!(!codes.verify(&user, &code));
    }

    #[test]
    fn wrong_code_and_wrong_secret_fail() {
        let codes = ConfirmationCodes::new(b"secret".to_vec());
        let user = sample_user();
        assert!(!codes.verify(&user, "0000"));

        let other = ConfirmationCodes::new(b"other-secret".to_vec());
        let code = other.code_for(&user);
        assert!(!codes.verify(&user, &code));
    }

    #[test]
    fn token_round_trip() {
        let tokens = AccessTokens::new(b"jwt-secret", 900);
        let user_id = Uuid::new_v4();
        let token = tokens.issue(user_id).unwrap();
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn garbage_and_foreign_tokens_are_rejected() {
        let tokens = AccessTokens::new(b"jwt-secret", 900);
        assert!(tokens.verify("not-a-token").is_err());

        let foreign = AccessTokens::new(b"other-secret", 900);
        let token = foreign.issue(Uuid::new_v4()).unwrap();
        assert!(tokens.verify(&token).is_err());
    }
}
