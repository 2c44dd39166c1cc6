//! PostgreSQL store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{ChatRoomStore, StoreError, UserStore};
use crate::model::{ChatRoom, User};

/// Both stores over one pool. Cascading deletes are done by the schema.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    password_hash: String,
    name: String,
    email: String,
    language: String,
    role: String,
    created_at: DateTime<Utc>,
    fcm_token: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            password_hash: row.password_hash,
            name: row.name,
            email: row.email,
            language: row.language,
            role: row.role,
            created_at: row.created_at,
            fcm_token: row.fcm_token,
        }
    }
}

#[derive(FromRow)]
struct ChatRoomRow {
    id: String,
    owner_id: String,
    last_message: String,
    last_message_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ChatRoomRow> for ChatRoom {
    fn from(row: ChatRoomRow) -> Self {
        Self {
            id: row.id,
            owner_id: row.owner_id,
            last_message: row.last_message,
            last_message_at: row.last_message_at,
            created_at: row.created_at,
        }
    }
}

const USER_COLUMNS: &str =
    "id, password_hash, name, email, language, role, created_at, fcm_token";
const ROOM_COLUMNS: &str = "id, owner_id, last_message, last_message_at, created_at";

fn backend(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::RowNotFound => StoreError::NotFound,
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            StoreError::Conflict(db.message().to_string())
        }
        other => StoreError::Backend(other.to_string()),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        crate::database::health_check(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn find_by_id(&self, id: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(User::from)
            .map_err(backend)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_one(&self.pool)
        .await
        .map(User::from)
        .map_err(backend)
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.id)
        .bind(&user.password_hash)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.language)
        .bind(&user.role)
        .bind(user.created_at)
        .bind(&user.fcm_token)
        .fetch_one(&self.pool)
        .await
        .map(User::from)
        .map_err(backend)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        sqlx::query_as::<_, UserRow>(&format!(
            "UPDATE users SET name = $2, language = $3, fcm_token = $4 WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.language)
        .bind(&user.fcm_token)
        .fetch_one(&self.pool)
        .await
        .map(User::from)
        .map_err(backend)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl ChatRoomStore for PgStore {
    async fn find_by_id(&self, id: &str) -> Result<ChatRoom, StoreError> {
        sqlx::query_as::<_, ChatRoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE id = $1"
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map(ChatRoom::from)
        .map_err(backend)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ChatRoom>, StoreError> {
        let rows = sqlx::query_as::<_, ChatRoomRow>(&format!(
            "SELECT {ROOM_COLUMNS} FROM chat_rooms WHERE owner_id = $1 ORDER BY created_at, id"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;
        Ok(rows.into_iter().map(ChatRoom::from).collect())
    }

    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, StoreError> {
        sqlx::query_as::<_, ChatRoomRow>(&format!(
            "INSERT INTO chat_rooms ({ROOM_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(&room.id)
        .bind(&room.owner_id)
        .bind(&room.last_message)
        .bind(room.last_message_at)
        .bind(room.created_at)
        .fetch_one(&self.pool)
        .await
        .map(ChatRoom::from)
        .map_err(backend)
    }

    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, StoreError> {
        sqlx::query_as::<_, ChatRoomRow>(&format!(
            "UPDATE chat_rooms SET last_message = $2, last_message_at = $3 WHERE id = $1 \
             RETURNING {ROOM_COLUMNS}"
        ))
        .bind(&room.id)
        .bind(&room.last_message)
        .bind(room.last_message_at)
        .fetch_one(&self.pool)
        .await
        .map(ChatRoom::from)
        .map_err(backend)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM chat_rooms WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(backend)?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
