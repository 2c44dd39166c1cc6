//! Accounts: registration, login and self-service profile

use axum::extract::State;

use super::lookup_failed;
use crate::app::AppState;
use crate::auth::{ensure_owner, AuthenticatedUser};
use crate::error::{AppError, Result};
use crate::model::{CreateUserRequest, Envelope, LoginRequest, UpdateUserRequest, User};
use crate::observability::SecurityEvent;
use crate::security_event;
use crate::store::StoreError;
use crate::validation::ValidatedJson;

/// `POST /users`
pub async fn create_user(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateUserRequest>,
) -> Result<Envelope> {
    let hash = state.hasher.hash_blocking(req.password).await?;
    let user = User::new(req.name, req.email, hash, req.language);

    let user = state.users.create(user).await.map_err(|err| match err {
        StoreError::Conflict(_) => AppError::conflict("An account with this email already exists"),
        other => AppError::from(other),
    })?;

    security_event!(
        SecurityEvent::UserRegistered,
        user_id = %user.id,
        "Account created"
    );

    Ok(Envelope::created("Account created").with_user(user.to_public()))
}

/// `POST /login`
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<Envelope> {
    let authenticated = state
        .authenticator
        .authenticate(&req.email, &req.password)
        .await?;

    Ok(Envelope::ok("Login succeeded")
        .with_user(authenticated.user)
        .with_token(authenticated.token))
}

/// `GET /users`
pub async fn get_user(State(state): State<AppState>, requester: AuthenticatedUser) -> Result<Envelope> {
    let user = load_own_account(&state, &requester).await?;
    Ok(Envelope::ok("Account retrieved").with_user(user.to_public()))
}

/// `PUT /users`
pub async fn update_user(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<UpdateUserRequest>,
) -> Result<Envelope> {
    let mut user = load_own_account(&state, &requester).await?;
    req.apply(&mut user);

    let user = state
        .users
        .update(user)
        .await
        .map_err(lookup_failed("Account"))?;

    security_event!(
        SecurityEvent::UserModified,
        user_id = %user.id,
        "Account updated"
    );

    Ok(Envelope::ok("Account updated").with_user(user.to_public()))
}

/// `DELETE /users`. Owned chat rooms go with the account.
pub async fn delete_user(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
) -> Result<Envelope> {
    let user = load_own_account(&state, &requester).await?;

    state
        .users
        .delete(&user.id)
        .await
        .map_err(lookup_failed("Account"))?;

    security_event!(
        SecurityEvent::UserDeleted,
        user_id = %user.id,
        "Account deleted"
    );

    Ok(Envelope::ok("Account deleted"))
}

/// The requester's own account, through the same ownership rule as any
/// other resource. A token for a deleted account gets a 404.
async fn load_own_account(state: &AppState, requester: &AuthenticatedUser) -> Result<User> {
    let user = state
        .users
        .find_by_id(&requester.subject_id)
        .await
        .map_err(lookup_failed("Account"))?;
    ensure_owner(requester, &user)?;
    Ok(user)
}
