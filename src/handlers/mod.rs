//! HTTP handlers
//!
//! Handlers take [`AppState`](crate::app::AppState) and, on guarded routes,
//! an [`AuthenticatedUser`](crate::auth::AuthenticatedUser). Every failure is
//! an [`AppError`]; every success is an [`Envelope`](crate::model::Envelope).

pub mod chat_rooms;
pub mod users;

use axum::{extract::State, Json};
use serde::Serialize;

use crate::app::AppState;
use crate::error::AppError;
use crate::store::StoreError;

pub use chat_rooms::{
    create_chat_room, delete_chat_room, get_chat_room, list_my_rooms, update_chat_room,
};
pub use users::{create_user, delete_user, get_user, login, update_user};

/// Liveness body for `GET /health`
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /ready`: 503 until the credential store answers.
pub async fn ready(State(state): State<AppState>) -> Result<Json<Health>, AppError> {
    state.users.ping().await.map_err(|err| {
        tracing::warn!(error = %err, "Readiness check failed");
        AppError::unavailable("Storage unavailable")
    })?;

    Ok(Json(Health {
        status: "ready",
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// Map a store lookup failure, naming the missing resource on 404.
pub(crate) fn lookup_failed(what: &'static str) -> impl FnOnce(StoreError) -> AppError {
    move |err| match err {
        StoreError::NotFound => AppError::not_found(format!("{what} not found")),
        other => AppError::from(other),
    }
}
