use std::{sync::Arc, time::Duration};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use super::{
    dto::{CredentialsCheckResponse, LogoutResponse, PublicUser, SessionResponse, VerifyResponse},
    error::AuthError,
    jwt::SessionKeys,
    resolver::within,
    verifier::IdentityVerifier,
};
use crate::users::{
    repo::{StoreError, UserStore},
    repo_types::{Role, User},
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Local lookup key for an email.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Username given to accounts that did not pick one: the email's local part.
pub fn default_username(email: &str) -> String {
    email.split('@').next().unwrap_or(email).to_string()
}

/// Login, registration, logout and session checks.
#[derive(Clone)]
pub struct AuthService {
    verifier: Arc<dyn IdentityVerifier>,
    users: Arc<dyn UserStore>,
    keys: SessionKeys,
    timeout: Duration,
}

impl AuthService {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        users: Arc<dyn UserStore>,
        keys: SessionKeys,
        timeout: Duration,
    ) -> Self {
        Self {
            verifier,
            users,
            keys,
            timeout,
        }
    }

    async fn check_identity(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let ok = within(self.timeout, "identity check", self.verifier.verify(email, password)).await??;
        if ok {
            Ok(())
        } else {
            warn!(email, "identity api did not verify credentials");
            Err(AuthError::InvalidCredentials)
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError> {
        within(self.timeout, "user lookup", self.users.find_by_email(email))
            .await?
            .map_err(AuthError::upstream)
    }

    async fn create_user(&self, email: &str, username: &str) -> Result<Result<User, StoreError>, AuthError> {
        within(self.timeout, "user insert", self.users.create(email, username, Role::User)).await
    }

    fn session(&self, user: &User, message: &str) -> Result<SessionResponse, AuthError> {
        let access_token = self
            .keys
            .issue(&user.email, user.user_id)
            .map_err(|e| AuthError::upstream(e.context("sign session token")))?;
        Ok(SessionResponse {
            access_token,
            token_type: "bearer",
            expires_in: self.keys.ttl_seconds(),
            user: PublicUser::from(user),
            message: message.to_string(),
        })
    }

    /// Verifies externally, then finds or creates the local user.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<SessionResponse, AuthError> {
        self.check_identity(email.trim(), password).await?;
        let email = normalize_email(email);

        let user = match self.find_by_email(&email).await? {
            Some(mut user) => {
                let at = within(self.timeout, "last_login update", self.users.touch_last_login(user.user_id))
                    .await?
                    .map_err(AuthError::upstream)?;
                user.last_login = Some(at);
                user
            }
            None => match self.create_user(&email, &default_username(&email)).await? {
                Ok(user) => {
                    info!(user_id = user.user_id, "created user on first login");
                    user
                }
                // Lost a race with a concurrent first login for the same email.
                Err(StoreError::DuplicateEmail) => self
                    .find_by_email(&email)
                    .await?
                    .ok_or_else(|| AuthError::upstream(anyhow::anyhow!("user vanished after duplicate insert")))?,
                Err(e) => return Err(AuthError::upstream(e)),
            },
        };

        info!(user_id = user.user_id, "user logged in");
        self.session(&user, "Login successful")
    }

    /// Creates the local account for an identity the external API already knows.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        username: Option<&str>,
    ) -> Result<SessionResponse, AuthError> {
        self.check_identity(email.trim(), password).await?;
        let email = normalize_email(email);

        if self.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AuthError::AlreadyRegistered);
        }

        let username = username
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| default_username(&email));

        let user = match self.create_user(&email, &username).await? {
            Ok(user) => user,
            Err(StoreError::DuplicateEmail) => return Err(AuthError::AlreadyRegistered),
            Err(e) => return Err(AuthError::upstream(e)),
        };

        info!(user_id = user.user_id, "user registered");
        self.session(&user, "Registration successful")
    }

    /// Tokens are stateless; the client is told to drop it.
    pub fn logout(&self, user: &User) -> LogoutResponse {
        info!(user_id = user.user_id, "user logged out");
        LogoutResponse {
            message: "Logout successful. Please discard your token.".into(),
            user_id: user.user_id,
        }
    }

    pub fn verify(&self, user: &User) -> VerifyResponse {
        VerifyResponse {
            valid: true,
            user: PublicUser::from(user),
        }
    }

    /// Checks credentials without touching local users or issuing a token.
    #[instrument(skip(self, password))]
    pub async fn check_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<CredentialsCheckResponse, AuthError> {
        let email = email.trim();
        self.check_identity(email, password).await?;
        Ok(CredentialsCheckResponse {
            valid: true,
            message: "Credentials are valid".into(),
            email: email.to_string(),
        })
    }
}
