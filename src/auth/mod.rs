//! Bearer-token verification for staff routes.
//!
//! Tokens are minted by an operator (`inquiry-desk token issue`) and resolved
//! back to a stored [`User`] on every admin request. A token whose user has
//! since been removed is rejected even if its signature is still valid.

mod token;

pub use token::{decode_token, encode_token, Claims};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::entity::User;
use crate::error::{CrmError, Result};
use crate::storage::SqliteStore;

/// Why a request failed authentication. All kinds map to 401.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthError {
    #[error("You are not logged in! Please log in to get access.")]
    MissingToken,

    #[error("Invalid token. Please log in again!")]
    InvalidToken,

    #[error("Your token has expired! Please log in again.")]
    ExpiredToken,

    #[error("The user belonging to this token does no longer exist.")]
    UnknownUser,
}

impl AuthError {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingToken => "missing",
            AuthError::InvalidToken => "malformed",
            AuthError::ExpiredToken => "expired",
            AuthError::UnknownUser => "identity_removed",
        }
    }
}

/// Extract the token from an `Authorization` header value.
pub fn bearer_token(header: Option<&str>) -> std::result::Result<&str, AuthError> {
    header
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(AuthError::MissingToken)
}

/// Signs and verifies session tokens with a shared secret.
#[derive(Clone)]
pub struct TokenAuthority {
    secret: Vec<u8>,
    ttl: Duration,
}

impl std::fmt::Debug for TokenAuthority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenAuthority")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenAuthority {
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issue(&self, user: &User, now: DateTime<Utc>) -> Result<String> {
        self.issue_with_ttl(user, now, self.ttl)
    }

    pub fn issue_with_ttl(&self, user: &User, now: DateTime<Utc>, ttl: Duration) -> Result<String> {
        if ttl <= Duration::zero() {
            return Err(CrmError::validation("ttl", "token lifetime must be positive"));
        }
        let expires = now
            .checked_add_signed(ttl)
            .ok_or_else(|| CrmError::validation("ttl", "token lifetime is out of range"))?;
        let claims = Claims {
            id: user.id,
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        encode_token(&claims, &self.secret)
    }

    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> std::result::Result<Claims, AuthError> {
        decode_token(token, &self.secret, now)
    }

    /// Full admin check: header → token → existing user.
    pub fn authenticate(
        &self,
        authorization: Option<&str>,
        store: &SqliteStore,
        now: DateTime<Utc>,
    ) -> Result<User> {
        let token = bearer_token(authorization)?;
        let claims = self.verify(token, now)?;
        store
            .get_user(&claims.id)?
            .ok_or(CrmError::Auth(AuthError::UnknownUser))
    }
}
