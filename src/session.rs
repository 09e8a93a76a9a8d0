//! Credentials for the remote compute service.
//!
//! A [`Session`] only carries a bearer token supplied by the caller or the
//! environment. Obtaining the token is out of scope.

use std::sync::OnceLock;

use tracing::{debug, info};

use crate::error::HarvestError;

/// Environment variable holding the bearer token by default.
pub const DEFAULT_TOKEN_ENV: &str = "GEOHARVEST_TOKEN";

/// Result of [`Session::ensure_authenticated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    /// This call established the session.
    Initialised,
    /// A previous call already did.
    AlreadyAuthenticated,
}

/// Process-lifetime credential holder, initialised at most once.
pub struct Session {
    token_env: String,
    explicit_token: Option<String>,
    active: OnceLock<String>,
}

impl Session {
    /// Session reading its token from `token_env`.
    #[must_use]
    pub fn new(token_env: impl Into<String>) -> Self {
        Self {
            token_env: token_env.into(),
            explicit_token: None,
            active: OnceLock::new(),
        }
    }

    /// Session using `token` instead of the environment.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            explicit_token: Some(token.into()),
            active: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn token_env(&self) -> &str {
        &self.token_env
    }

    /// Initialises the session once. Later calls are no-ops.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Auth`] when no token is available.
    pub fn ensure_authenticated(&self) -> Result<AuthStatus, HarvestError> {
        if self.active.get().is_some() {
            debug!("Session already authenticated");
            return Ok(AuthStatus::AlreadyAuthenticated);
        }
        let token = self.lookup_token()?;
        if self.active.set(token).is_err() {
            return Ok(AuthStatus::AlreadyAuthenticated);
        }
        info!(token_env = %self.token_env, "Session initialised");
        Ok(AuthStatus::Initialised)
    }

    /// The active bearer token, if the session is initialised.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.active.get().map(String::as_str)
    }

    fn lookup_token(&self) -> Result<String, HarvestError> {
        if let Some(token) = &self.explicit_token {
            return non_empty(token, &self.token_env);
        }
        match std::env::var(&self.token_env) {
            Ok(token) => non_empty(&token, &self.token_env),
            Err(_) => Err(HarvestError::Auth {
                token_env: self.token_env.clone(),
                reason: format!("environment variable {} is not set", self.token_env),
            }),
        }
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(DEFAULT_TOKEN_ENV)
    }
}

fn non_empty(token: &str, token_env: &str) -> Result<String, HarvestError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(HarvestError::Auth {
            token_env: token_env.to_string(),
            reason: "token is empty".to_string(),
        });
    }
    Ok(token.to_string())
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("token_env", &self.token_env)
            .field("authenticated", &self.active.get().is_some())
            .finish_non_exhaustive()
    }
}
