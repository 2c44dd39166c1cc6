//! Domain records and wire types
//!
//! Stored records ([`User`], [`ChatRoom`]) are never serialized directly.
//! Responses go through the public projections ([`PublicUser`],
//! [`ChatRoomView`]) so the password hash cannot leak by accident.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::{
    validate_email, validate_length, validate_no_control, validate_required, Validate,
    ValidationError,
};

/// Default role for self-registered accounts
pub const DEFAULT_ROLE: &str = "user";

/// Default language when an account does not pick one
pub const DEFAULT_LANGUAGE: &str = "en";

// ============================================================================
// Stored records
// ============================================================================

/// Account record as held by a [`UserStore`](crate::store::UserStore)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub password_hash: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub fcm_token: String,
}

impl User {
    /// Build a fresh account with a generated id.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        language: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            password_hash: password_hash.into(),
            name: name.into(),
            email: email.into(),
            language: language
                .filter(|l| !l.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            role: DEFAULT_ROLE.to_string(),
            created_at: Utc::now(),
            fcm_token: String::new(),
        }
    }

    /// Public-safe projection
    pub fn to_public(&self) -> PublicUser {
        PublicUser {
            user_id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            language: self.language.clone(),
            role: self.role.clone(),
            created_at: self.created_at,
            fcm_token: self.fcm_token.clone(),
        }
    }
}

/// Chat room record. `owner_id` is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRoom {
    pub id: String,
    pub owner_id: String,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    /// Build an empty room owned by `owner_id`.
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            owner_id: owner_id.into(),
            last_message: String::new(),
            last_message_at: None,
            created_at: Utc::now(),
        }
    }

    /// Render with the owner's public projection.
    pub fn view(&self, owner: &User) -> ChatRoomView {
        ChatRoomView {
            chat_room_id: self.id.clone(),
            owner: owner.to_public(),
            last_message: self.last_message.clone(),
            last_message_at: self.last_message_at,
            created_at: self.created_at,
        }
    }
}

// ============================================================================
// Responses
// ============================================================================

/// Account as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "userID")]
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub language: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub fcm_token: String,
}

/// Chat room as returned to clients
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomView {
    #[serde(rename = "chatRoomID")]
    pub chat_room_id: String,
    pub owner: PublicUser,
    pub last_message: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Success envelope: `{ status, message, token?, user?, chatRoom?, chatRooms? }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<PublicUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room: Option<ChatRoomView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_rooms: Option<Vec<ChatRoomView>>,
}

impl Envelope {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
            token: None,
            user: None,
            chat_room: None,
            chat_rooms: None,
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, message)
    }

    pub fn created(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CREATED, message)
    }

    pub fn with_token(mut self, token: String) -> Self {
        self.token = Some(token);
        self
    }

    pub fn with_user(mut self, user: PublicUser) -> Self {
        self.user = Some(user);
        self
    }

    pub fn with_chat_room(mut self, room: ChatRoomView) -> Self {
        self.chat_room = Some(room);
        self
    }

    pub fn with_chat_rooms(mut self, rooms: Vec<ChatRoomView>) -> Self {
        self.chat_rooms = Some(rooms);
        self
    }
}

impl IntoResponse for Envelope {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

// ============================================================================
// Requests
// ============================================================================

/// `POST /users`
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub language: Option<String>,
}

impl Validate for CreateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_required(&self.name, "name")?;
        validate_length(&self.name, 1, 64, "name")?;
        validate_no_control(&self.name, "name")?;
        validate_length(&self.email, 3, 254, "email")?;
        validate_email(&self.email)?;
        validate_length(&self.password, 8, 128, "password")?;
        if let Some(language) = &self.language {
            validate_length(language, 0, 16, "language")?;
        }
        Ok(())
    }
}

/// `POST /login`
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_required(&self.email, "email")?;
        validate_required(&self.password, "password")?;
        validate_length(&self.password, 1, 128, "password")?;
        Ok(())
    }
}

/// `PUT /users`. Only profile fields are writable; unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub language: Option<String>,
    pub fcm_token: Option<String>,
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validate_required(name, "name")?;
            validate_length(name, 1, 64, "name")?;
            validate_no_control(name, "name")?;
        }
        if let Some(language) = &self.language {
            validate_length(language, 0, 16, "language")?;
        }
        if let Some(token) = &self.fcm_token {
            validate_length(token, 0, 4096, "fcmToken")?;
        }
        Ok(())
    }
}

impl UpdateUserRequest {
    /// Apply the present fields to `user`.
    pub fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = name;
        }
        if let Some(language) = self.language {
            user.language = language;
        }
        if let Some(token) = self.fcm_token {
            user.fcm_token = token;
        }
    }
}

/// `PUT /chat-room/{id}`. The owner is not writable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatRoomRequest {
    pub last_message: Option<String>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Validate for UpdateChatRoomRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if let Some(message) = &self.last_message {
            validate_length(message, 0, 4096, "lastMessage")?;
        }
        Ok(())
    }
}

impl UpdateChatRoomRequest {
    /// Apply the present fields to `room`. A new message without an explicit
    /// timestamp is stamped with the current time.
    pub fn apply(self, room: &mut ChatRoom) {
        if let Some(message) = self.last_message {
            room.last_message = message;
            room.last_message_at = Some(self.last_message_at.unwrap_or_else(Utc::now));
        } else if let Some(at) = self.last_message_at {
            room.last_message_at = Some(at);
        }
    }
}
