//! Authentication Flow
//!
//! Email + password in, public account + bearer token out. An unknown email
//! and a wrong password produce the same [`AuthError::InvalidCredentials`],
//! and the unknown-email path still runs one Argon2 verification so both
//! take comparable time.

use std::sync::Arc;

use thiserror::Error;

use super::password::{PasswordError, PasswordHasher};
use super::token::{TokenError, TokenService};
use crate::model::PublicUser;
use crate::observability::SecurityEvent;
use crate::security_event;
use crate::store::{StoreError, UserStore};

/// Authentication failures
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The credential store failed for a reason other than not-found
    #[error("credential store failed: {0}")]
    Store(#[from] StoreError),

    /// Stored hash unusable or hashing worker failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Token could not be issued
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Successful authentication
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub user: PublicUser,
    pub token: String,
}

/// Verifies credentials against a [`UserStore`] and issues tokens.
pub struct Authenticator {
    users: Arc<dyn UserStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
    /// Hash of a throwaway password, verified against when the email is unknown
    dummy_hash: String,
}

impl Authenticator {
    /// Build the flow. Hashes one throwaway password, so call it at startup.
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Result<Self, AuthError> {
        let dummy_hash = hasher.hash(&uuid::Uuid::new_v4().to_string())?;
        Ok(Self {
            users,
            hasher,
            tokens,
            dummy_hash,
        })
    }

    /// Verify `email` / `password` and issue a token for the account.
    ///
    /// Never mutates the account.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Authenticated, AuthError> {
        let user = match self.users.find_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                // result ignored; only the elapsed time matters
                let _ = self
                    .hasher
                    .verify_blocking(password.to_owned(), self.dummy_hash.clone())
                    .await;
                security_event!(
                    SecurityEvent::AuthenticationFailure,
                    email = %email,
                    reason = "unknown_email",
                    "Authentication failed"
                );
                return Err(AuthError::InvalidCredentials);
            }
            Err(e) => return Err(e.into()),
        };

        let matches = self
            .hasher
            .verify_blocking(password.to_owned(), user.password_hash.clone())
            .await
            .inspect_err(|e| {
                tracing::error!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            })?;

        if !matches {
            security_event!(
                SecurityEvent::AuthenticationFailure,
                email = %email,
                user_id = %user.id,
                reason = "password_mismatch",
                "Authentication failed"
            );
            return Err(AuthError::InvalidCredentials);
        }

        let token = self.tokens.issue(&user.id, &user.email, self.tokens.ttl())?;

        security_event!(
            SecurityEvent::AuthenticationSuccess,
            user_id = %user.id,
            "User authenticated"
        );

        Ok(Authenticated {
            user: user.to_public(),
            token,
        })
    }
}
