//! # Bridger
//!
//! Accounts and chat rooms behind bearer-token authentication.
//!
//! Passwords are stored as Argon2id hashes; a successful login issues an
//! HS256 token carrying the account id and email. Protected routes run a
//! guard that validates the token and binds an [`auth::AuthenticatedUser`]
//! before the handler runs; mutations additionally require the requester to
//! own the target resource.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use bridger::app::{build_router, AppState};
//! use bridger::auth::TokenService;
//! use bridger::config::AppConfig;
//! use bridger::store::MemoryStore;
//! use bridger::SecureRouter;
//!
//! let config = AppConfig::from_env()?;
//! let store = MemoryStore::new();
//! let state = AppState::new(
//!     TokenService::new(&config.signing_secret, config.token_ttl),
//!     config.password_hasher.clone(),
//!     Arc::new(store.clone()),
//!     Arc::new(store),
//! )?;
//! let app = build_router(state).with_security(config.security.clone());
//! ```

pub mod app;
pub mod audit;
pub mod auth;
pub mod config;
#[cfg(feature = "postgres")]
pub mod database;
pub mod error;
pub mod handlers;
mod layers;
pub mod model;
pub mod observability;
mod parse;
pub mod store;
pub mod validation;

// Re-exports
pub use config::{AppConfig, ConfigError, SecurityConfig, SecurityConfigBuilder};
pub use error::{AppError, ErrorKind};
pub use layers::SecureRouter;
pub use observability::ObservabilityConfigBuilder;
pub use parse::{parse_duration, parse_size};

#[cfg(feature = "postgres")]
pub use database::{create_pool, health_check, DatabaseConfig, DatabaseError, HealthStatus, SslMode};
