use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, SessionClaims};
use crate::config::SessionConfig;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("malformed or unsigned token: {0}")]
    Malformed(#[from] jsonwebtoken::errors::Error),
    #[error("token expired")]
    Expired,
}

/// Signs and checks session tokens with the process-wide HMAC key.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: TimeDuration,
}

impl SessionKeys {
    pub fn new(secret: &[u8], ttl: TimeDuration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }

    pub fn from_config(cfg: &SessionConfig) -> Self {
        Self::new(cfg.secret.as_bytes(), TimeDuration::hours(cfg.ttl_hours))
    }

    /// Token lifetime in seconds, as reported to clients in `expires_in`.
    pub fn ttl_seconds(&self) -> i64 {
        self.ttl.whole_seconds()
    }

    pub fn issue(&self, email: &str, user_id: i64) -> anyhow::Result<String> {
        self.issue_at(email, user_id, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, email: &str, user_id: i64, now: OffsetDateTime) -> anyhow::Result<String> {
        let claims = Claims {
            sub: email.to_string(),
            user_id,
            email: email.to_string(),
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, "session token signed");
        Ok(token)
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.validate_at(token, OffsetDateTime::now_utc())
    }

    /// A token is dead from the second of its `exp` onwards.
    pub fn validate_at(&self, token: &str, now: OffsetDateTime) -> Result<SessionClaims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        if now.unix_timestamp() >= data.claims.exp {
            return Err(TokenError::Expired);
        }
        debug!(user_id = data.claims.user_id, "session token verified");
        Ok(data.claims.into())
    }
}
