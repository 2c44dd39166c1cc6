//! Identity Tokens
//!
//! Issues and validates compact HS256 JWTs carrying the subject id, email,
//! issue time and absolute expiry. Tokens are stateless: nothing is recorded
//! server-side, so a token stays usable until it expires.
//!
//! Key material comes from a [`SigningSecret`] handed to [`TokenService::new`]
//! once at startup; the service never reads configuration on its own.
//!
//! Expiry is checked here rather than by `jsonwebtoken`, because a token must
//! be rejected at exactly `now >= exp` with no leeway.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::secret::SigningSecret;

/// Default token lifetime
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Claims carried in every issued token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account id)
    #[serde(rename = "userID")]
    pub subject_id: String,
    /// Account email at issue time
    pub email: String,
    /// Issued-at, seconds since epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    /// Expiry, seconds since epoch
    pub exp: i64,
}

impl Claims {
    /// Whether the claims are expired at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() >= self.exp
    }
}

/// Token issuance and validation failures
///
/// Every validation variant means "not authenticated" to callers; the
/// distinction exists for logs only.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// Not a parseable token, or required claims are missing
    #[error("malformed token")]
    Malformed,
    /// Signature does not verify under the configured key and algorithm
    #[error("token signature is invalid")]
    SignatureInvalid,
    /// Signature is valid but the expiry has passed
    #[error("token has expired")]
    Expired,
    /// Token could not be produced
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl TokenError {
    /// Short machine-readable reason for audit logs
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Malformed => "malformed",
            Self::SignatureInvalid => "signature_invalid",
            Self::Expired => "expired",
            Self::Encoding(_) => "encoding_failed",
        }
    }
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            JwtErrorKind::InvalidSignature
            | JwtErrorKind::InvalidAlgorithm
            | JwtErrorKind::InvalidAlgorithmName
            | JwtErrorKind::InvalidKeyFormat => Self::SignatureInvalid,
            JwtErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Malformed,
        }
    }
}

/// HS256 token issuer and validator.
///
/// Immutable after construction and safe to share across tasks.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    /// Build a service from validated key material and the default lifetime.
    pub fn new(secret: &SigningSecret, ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl,
        }
    }

    /// Lifetime applied by the authentication flow
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a token that expires `ttl` from now.
    pub fn issue(&self, subject_id: &str, email: &str, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(subject_id, email, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        subject_id: &str,
        email: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let issued_at = now.timestamp();
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| issued_at.checked_add(secs))
            .ok_or_else(|| TokenError::Encoding("token lifetime overflows".into()))?;

        let claims = Claims {
            subject_id: subject_id.to_string(),
            email: email.to_string(),
            iat: Some(issued_at),
            exp,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Validate a token against the current wall clock.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    /// Validate a token as if the current time were `now`.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding, &self.validation)?.claims;

        if claims.subject_id.is_empty() {
            return Err(TokenError::Malformed);
        }
        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("algorithm", &Algorithm::HS256)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) fn test_service() -> TokenService {
    use super::secret::SecretPolicy;

    let secret = SigningSecret::new("unit-signing-key-0123456789abcdef", &SecretPolicy::permissive())
        .expect("valid test secret");
    TokenService::new(&secret, DEFAULT_TOKEN_TTL)
}
