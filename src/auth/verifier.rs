use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{error, instrument, warn};

use super::error::AuthError;
use crate::config::IdentityApiConfig;

/// External authority on email/password pairs.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// `Ok(false)` for rejected credentials; `Err` only when the service
    /// could not be asked.
    async fn verify(&self, email: &str, password: &str) -> Result<bool, AuthError>;
}

/// The identity API answers `["Verified","True"]` for good credentials.
pub fn is_verified_response(body: &Value) -> bool {
    match body.as_array() {
        Some(items) if items.len() == 2 => {
            items[0].as_str() == Some("Verified") && items[1].as_str() == Some("True")
        }
        _ => false,
    }
}

#[derive(Clone)]
pub struct HttpIdentityVerifier {
    client: Client,
    url: String,
}

impl HttpIdentityVerifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("build identity api client")?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn from_config(cfg: &IdentityApiConfig) -> anyhow::Result<Self> {
        Self::new(cfg.url.clone(), cfg.timeout())
    }
}

#[async_trait]
impl IdentityVerifier for HttpIdentityVerifier {
    #[instrument(skip(self, password))]
    async fn verify(&self, email: &str, password: &str) -> Result<bool, AuthError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "identity api unreachable");
                AuthError::upstream(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "identity api rejected credentials");
            return Ok(false);
        }

        match response.json::<Value>().await {
            Ok(body) => Ok(is_verified_response(&body)),
            Err(e) => {
                warn!(error = %e, "identity api returned a non-json body");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
pub mod fake {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Accepts a fixed set of credentials.
    #[derive(Default)]
    pub struct FakeVerifier {
        accepted: Vec<(String, String)>,
        unreachable: bool,
        pub calls: AtomicUsize,
    }

    impl FakeVerifier {
        pub fn accepting(email: &str, password: &str) -> Self {
            Self {
                accepted: vec![(email.into(), password.into())],
                ..Default::default()
            }
        }

        pub fn unreachable() -> Self {
            Self {
                unreachable: true,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl IdentityVerifier for FakeVerifier {
        async fn verify(&self, email: &str, password: &str) -> Result<bool, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.unreachable {
                return Err(AuthError::upstream(anyhow::anyhow!("timed out")));
            }
            Ok(self.accepted.iter().any(|(e, p)| e == email && p == password))
        }
    }
}
