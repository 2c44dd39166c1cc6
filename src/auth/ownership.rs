//! Ownership Policy
//!
//! One rule for every mutating operation on an owned resource: the
//! authenticated subject must be the resource's owner. Resources opt in by
//! implementing [`Owned`].

use super::guard::AuthenticatedUser;
use crate::error::AppError;
use crate::model::{ChatRoom, User};
use crate::observability::SecurityEvent;
use crate::security_event;

/// A resource with a single, immutable owner.
pub trait Owned {
    /// Id of the owning account
    fn owner_id(&self) -> &str;

    /// Id of the resource itself, for audit records
    fn resource_id(&self) -> &str;

    /// Short resource kind, for audit records
    const KIND: &'static str;
}

impl Owned for ChatRoom {
    const KIND: &'static str = "chat_room";

    fn owner_id(&self) -> &str {
        &self.owner_id
    }

    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// An account is owned by itself.
impl Owned for User {
    const KIND: &'static str = "user";

    fn owner_id(&self) -> &str {
        &self.id
    }

    fn resource_id(&self) -> &str {
        &self.id
    }
}

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// `Allow` iff the requester is the owner.
pub fn authorize(requester_id: &str, owner_id: &str) -> Decision {
    if requester_id == owner_id {
        Decision::Allow
    } else {
        Decision::Deny
    }
}

/// Apply [`authorize`] to a loaded resource, logging the decision.
///
/// Deny becomes a 403, which is distinct from the guard's 401.
pub fn ensure_owner<R: Owned>(user: &AuthenticatedUser, resource: &R) -> Result<(), AppError> {
    match authorize(&user.subject_id, resource.owner_id()) {
        Decision::Allow => {
            security_event!(
                SecurityEvent::AccessGranted,
                user_id = %user.subject_id,
                resource = R::KIND,
                resource_id = %resource.resource_id(),
                "Access granted"
            );
            Ok(())
        }
        Decision::Deny => {
            security_event!(
                SecurityEvent::AccessDenied,
                user_id = %user.subject_id,
                resource = R::KIND,
                resource_id = %resource.resource_id(),
                owner_id = %resource.owner_id(),
                "Access denied: not the owner"
            );
            Err(AppError::forbidden(format!("Not the owner of this {}", R::KIND)))
        }
    }
}
