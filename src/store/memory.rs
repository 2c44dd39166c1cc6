//! In-memory store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{ChatRoomStore, StoreError, UserStore};
use crate::model::{ChatRoom, User};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<String, User>,
    /// email -> user id
    emails: HashMap<String, String>,
    rooms: HashMap<String, ChatRoom>,
}

/// Both stores over one lock, so the account cascade is atomic.
///
/// Cloning shares the underlying tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<User, StoreError> {
        self.tables
            .read()
            .users
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let tables = self.tables.read();
        tables
            .emails
            .get(email)
            .and_then(|id| tables.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        if tables.emails.contains_key(&user.email) {
            return Err(StoreError::Conflict("email already registered".into()));
        }
        if tables.users.contains_key(&user.id) {
            return Err(StoreError::Conflict("user id already exists".into()));
        }
        tables.emails.insert(user.email.clone(), user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables.users.get_mut(&user.id).ok_or(StoreError::NotFound)?;
        stored.name = user.name;
        stored.language = user.language;
        stored.fcm_token = user.fcm_token;
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let user = tables.users.remove(id).ok_or(StoreError::NotFound)?;
        tables.emails.remove(&user.email);
        tables.rooms.retain(|_, room| room.owner_id != id);
        Ok(())
    }
}

#[async_trait]
impl ChatRoomStore for MemoryStore {
    async fn find_by_id(&self, id: &str) -> Result<ChatRoom, StoreError> {
        self.tables
            .read()
            .rooms
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<ChatRoom>, StoreError> {
        let mut rooms: Vec<ChatRoom> = self
            .tables
            .read()
            .rooms
            .values()
            .filter(|room| room.owner_id == owner_id)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn create(&self, room: ChatRoom) -> Result<ChatRoom, StoreError> {
        let mut tables = self.tables.write();
        if !tables.users.contains_key(&room.owner_id) {
            return Err(StoreError::Backend(format!(
                "owner {} does not exist",
                room.owner_id
            )));
        }
        if tables.rooms.contains_key(&room.id) {
            return Err(StoreError::Conflict("chat room id already exists".into()));
        }
        tables.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    async fn update(&self, room: ChatRoom) -> Result<ChatRoom, StoreError> {
        let mut tables = self.tables.write();
        let stored = tables.rooms.get_mut(&room.id).ok_or(StoreError::NotFound)?;
        stored.last_message = room.last_message;
        stored.last_message_at = room.last_message_at;
        Ok(stored.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.tables
            .write()
            .rooms
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
