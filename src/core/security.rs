// src/core/security.rs
//! Anti-forgery tokens for the public forms and keyed hashing of addresses.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::app_log;

type HmacSha256 = Hmac<Sha256>;

pub const NONCE_AUDIENCE: &str = "trainer_registration";

#[derive(Debug, Serialize, Deserialize)]
struct NonceClaims {
    aud: String,
    jti: String,
    iat: i64,
    exp: i64,
}

/// Issues and checks the short-lived token every public POST must carry.
#[derive(Clone)]
pub struct NonceGuard {
    secret: String,
    ttl: Duration,
}

impl NonceGuard {
    pub fn new(secret: impl Into<String>, ttl_minutes: i64) -> Self {
        Self {
            secret: secret.into(),
            ttl: Duration::minutes(ttl_minutes),
        }
    }

    pub fn issue(&self) -> Result<String> {
        let now = Utc::now();
        let claims = NonceClaims {
            aud: NONCE_AUDIENCE.to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context("Failed to sign nonce")
    }

    pub fn verify(&self, token: &str) -> bool {
        if token.is_empty() {
            return false;
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[NONCE_AUDIENCE]);
        validation.leeway = 0;

        match decode::<NonceClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        ) {
            Ok(_) => true,
            Err(e) => {
                app_log!(warn, "Rejected nonce: {}", e);
                false
            }
        }
    }
}

/// Keyed hash of an address for logs that must not hold it in clear.
pub fn hash_recipient(secret: &str, email: &str) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        // HMAC accepts keys of any length
        Err(_) => return String::new(),
    };
    mac.update(email.trim().to_lowercase().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Transient key of the per-recipient send counter.
pub fn rate_limit_key(email: &str) -> String {
    let digest = Sha256::digest(email.trim().to_lowercase().as_bytes());
    format!("trpro_email_rate_{}", hex::encode(digest))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_nonce_verifies() {
        let guard = NonceGuard::new("secret", 10);
        let token = guard.issue().unwrap();
        assert!(guard.verify(&token));
    }

    #[test]
    fn test_nonce_from_other_secret_is_rejected() {
        let token = NonceGuard::new("other", 10).issue().unwrap();
        assert!(!NonceGuard::new("secret", 10).verify(&token));
    }

    #[test]
    fn test_expired_or_garbage_nonce_is_rejected() {
        let guard = NonceGuard::new("secret", -5);
        let token = guard.issue().unwrap();
        assert!(!guard.verify(&token));
        assert!(!guard.verify("not-a-token"));
        assert!(!guard.verify(""));
    }

    #[test]
    fn test_wrong_audience_is_rejected() {
        let claims = NonceClaims {
            aud: "someone_else".to_string(),
            jti: "x".to_string(),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::minutes(5)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(!NonceGuard::new("secret", 10).verify(&token));
    }

    #[test]
    fn test_recipient_hash_is_keyed_and_normalized() {
        let a = hash_recipient("k1", "Marie@Example.com");
        assert_eq!(a, hash_recipient("k1", " marie@example.com "));
        assert_ne!(a, hash_recipient("k2", "marie@example.com"));
        assert_eq!(a.len(), 64);
        assert!(!a.contains("marie"));
    }

    #[test]
    fn test_rate_limit_key() {
        assert_eq!(rate_limit_key("A@b.co"), rate_limit_key("a@b.co"));
        assert!(rate_limit_key("a@b.co").starts_with("trpro_email_rate_"));
    }
}
