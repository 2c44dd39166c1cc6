//! Authentication and authorization core
//!
//! - [`password`]: Argon2id hashing
//! - [`secret`]: signing-secret policy
//! - [`token`]: HS256 bearer tokens
//! - [`authenticate`]: email + password login flow
//! - [`guard`]: request middleware and the [`AuthenticatedUser`] extractor
//! - [`ownership`]: the owner-only rule for mutations

pub mod authenticate;
pub mod guard;
pub mod ownership;
pub mod password;
pub mod secret;
pub mod token;

pub use authenticate::{AuthError, Authenticated, Authenticator};
pub use guard::{require_auth, AuthenticatedUser};
pub use ownership::{authorize, ensure_owner, Decision, Owned};
pub use password::{HashCost, PasswordError, PasswordHasher};
pub use secret::{SecretError, SecretPolicy, SigningSecret};
pub use token::{Claims, TokenError, TokenService, DEFAULT_TOKEN_TTL};
