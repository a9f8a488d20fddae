use std::time::Duration;

use anyhow::Context;
use rand::{distributions::Alphanumeric, Rng};
use serde::Deserialize;
use tracing::warn;

const DEFAULT_TTL_HOURS: i64 = 24;
const MAX_TTL_HOURS: i64 = 720;

pub const DEFAULT_AUTH_API_URL: &str = "https://web.socem.plymouth.ac.uk/COMP2001/auth/api/users";

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityApiConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl IdentityApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub session: SessionConfig,
    pub identity: IdentityApiConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let secret = match std::env::var("SESSION_SECRET") {
            Ok(s) if !s.trim().is_empty() => s,
            _ => {
                warn!("SESSION_SECRET not set; generated a per-process key, sessions will not survive a restart");
                generate_secret()
            }
        };
        let session = SessionConfig {
            secret,
            ttl_hours: session_ttl_hours(std::env::var("SESSION_TTL_HOURS").ok().as_deref())?,
        };
        let identity = IdentityApiConfig {
            url: std::env::var("AUTH_API_URL").unwrap_or_else(|_| DEFAULT_AUTH_API_URL.into()),
            timeout_secs: env_parse("AUTH_API_TIMEOUT_SECS").unwrap_or(10),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            session,
            identity,
        })
    }
}

/// Unset means 24; anything else must be a whole number of hours in `1..=720`.
fn session_ttl_hours(raw: Option<&str>) -> anyhow::Result<i64> {
    let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
        return Ok(DEFAULT_TTL_HOURS);
    };
    let hours: i64 = raw
        .parse()
        .with_context(|| format!("SESSION_TTL_HOURS is not a number: {raw}"))?;
    if !(1..=MAX_TTL_HOURS).contains(&hours) {
        anyhow::bail!("SESSION_TTL_HOURS must be between 1 and {MAX_TTL_HOURS}, got {hours}");
    }
    Ok(hours)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

/// Random 32-character key for processes started without `SESSION_SECRET`.
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
