//! Chat rooms
//!
//! Reads by id are public. Every mutation loads the stored room first and
//! checks the requester against the stored owner; nothing in the request
//! body can change who owns a room.

use axum::extract::{Path, State};

use super::lookup_failed;
use crate::app::AppState;
use crate::auth::{ensure_owner, AuthenticatedUser};
use crate::error::Result;
use crate::model::{ChatRoom, Envelope, UpdateChatRoomRequest};
use crate::observability::SecurityEvent;
use crate::security_event;
use crate::validation::ValidatedJson;

/// `POST /chat-room`
pub async fn create_chat_room(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
) -> Result<Envelope> {
    let owner = state
        .users
        .find_by_id(&requester.subject_id)
        .await
        .map_err(lookup_failed("Account"))?;

    let room = state.rooms.create(ChatRoom::new(owner.id.clone())).await?;

    security_event!(
        SecurityEvent::ResourceCreated,
        user_id = %owner.id,
        resource = "chat_room",
        resource_id = %room.id,
        "Chat room created"
    );

    Ok(Envelope::created("Chat room created").with_chat_room(room.view(&owner)))
}

/// `GET /chat-room/{id}`
pub async fn get_chat_room(State(state): State<AppState>, Path(id): Path<String>) -> Result<Envelope> {
    let room = state
        .rooms
        .find_by_id(&id)
        .await
        .map_err(lookup_failed("Chat room"))?;
    let owner = state
        .users
        .find_by_id(&room.owner_id)
        .await
        .map_err(lookup_failed("Chat room owner"))?;

    Ok(Envelope::ok("Chat room retrieved").with_chat_room(room.view(&owner)))
}

/// `PUT /chat-room/{id}`
pub async fn update_chat_room(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateChatRoomRequest>,
) -> Result<Envelope> {
    let mut room = state
        .rooms
        .find_by_id(&id)
        .await
        .map_err(lookup_failed("Chat room"))?;
    ensure_owner(&requester, &room)?;

    req.apply(&mut room);
    let room = state
        .rooms
        .update(room)
        .await
        .map_err(lookup_failed("Chat room"))?;

    security_event!(
        SecurityEvent::ResourceModified,
        user_id = %requester.subject_id,
        resource = "chat_room",
        resource_id = %room.id,
        "Chat room updated"
    );

    let owner = state
        .users
        .find_by_id(&room.owner_id)
        .await
        .map_err(lookup_failed("Account"))?;
    Ok(Envelope::ok("Chat room updated").with_chat_room(room.view(&owner)))
}

/// `DELETE /chat-room/{id}`
pub async fn delete_chat_room(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope> {
    let room = state
        .rooms
        .find_by_id(&id)
        .await
        .map_err(lookup_failed("Chat room"))?;
    ensure_owner(&requester, &room)?;

    state
        .rooms
        .delete(&room.id)
        .await
        .map_err(lookup_failed("Chat room"))?;

    security_event!(
        SecurityEvent::ResourceDeleted,
        user_id = %requester.subject_id,
        resource = "chat_room",
        resource_id = %room.id,
        "Chat room deleted"
    );

    Ok(Envelope::ok("Chat room deleted"))
}

/// `GET /chat-rooms`: rooms owned by the requester, oldest first
pub async fn list_my_rooms(
    State(state): State<AppState>,
    requester: AuthenticatedUser,
) -> Result<Envelope> {
    let owner = state
        .users
        .find_by_id(&requester.subject_id)
        .await
        .map_err(lookup_failed("Account"))?;
    let rooms = state.rooms.find_by_owner(&owner.id).await?;

    let views = rooms.iter().map(|room| room.view(&owner)).collect();
    Ok(Envelope::ok("Chat rooms retrieved").with_chat_rooms(views))
}
