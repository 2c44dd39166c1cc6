//! Persistence contracts
//!
//! The auth core only depends on these traits. [`MemoryStore`] backs tests
//! and single-node runs; `PgStore` (feature `postgres`) backs production.
//!
//! Not-found is always reported as [`StoreError::NotFound`], never folded into
//! a backend failure, so callers can map it to 404 or to invalid credentials.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{ChatRoom, User};

/// Store failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with the requested key
    #[error("record not found")]
    NotFound,
    /// A uniqueness constraint would be violated
    #[error("conflict: {0}")]
    Conflict(String),
    /// The backend failed
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Credential store: account records keyed by id and by email.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<User, StoreError>;

    /// Exact, case-sensitive email match.
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Insert a new account. Duplicate id or email is a [`StoreError::Conflict`].
    async fn create(&self, user: User) -> Result<User, StoreError>;

    /// Replace the mutable profile fields of an existing account.
    async fn update(&self, user: User) -> Result<User, StoreError>;

    /// Remove an account and every chat room it owns.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Whether the backend can serve requests. In-process stores always can.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Chat room records.
#[async_trait]
pub trait ChatRoomStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<ChatRoom, StoreError>;

    /// Rooms owned by `owner_id`, oldest first.
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ChatRoom>, StoreError>;

    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, StoreError>;

    /// Replace the message fields of an existing room. The owner is never changed.
    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}
