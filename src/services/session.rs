//! Session service

use std::sync::Arc;

use chrono::Duration;
use data_encoding::BASE64URL_NOPAD;
use uuid::Uuid;

use crate::db::{ItemStore, StoreError, StoredItem};
use crate::models::session::{Session, RECORD_TYPE};
use crate::models::time;

/// Creates, fetches and revokes browser sessions
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn ItemStore>,
    ttl: Duration,
}

impl SessionService {
    pub fn new(store: Arc<dyn ItemStore>, ttl_hours: i64) -> Self {
        Self {
            store,
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Generate an unguessable URL-safe token: 32 random bytes, base64url.
    pub fn generate_token() -> String {
        let mut bytes = [0u8; 32];
        bytes[..16].copy_from_slice(Uuid::new_v4().as_bytes());
        bytes[16..].copy_from_slice(Uuid::new_v4().as_bytes());
        BASE64URL_NOPAD.encode(&bytes)
    }

    /// Create a session for a user and return it as persisted.
    pub async fn create(&self, user_id: &str) -> Result<Session, StoreError> {
        let session = Session {
            id: Self::generate_token(),
            user_id: user_id.to_string(),
            expires: time::now() + self.ttl,
        };

        let item = StoredItem::from_record(session.key(), RECORD_TYPE, &session)?;
        self.store.put(&item).await?;

        // Read back what actually landed in the store
        match self.get(&session.id).await? {
            Some(persisted) => Ok(persisted),
            None => Err(StoreError::Corrupt {
                pk: session.key().pk,
                reason: "session vanished after write".to_string(),
            }),
        }
    }

    /// Fetch a session by token; absent tokens yield `Ok(None)`.
    pub async fn get(&self, id: &str) -> Result<Option<Session>, StoreError> {
        match self.store.get(&Session::key_for(id)).await? {
            Some(item) => Ok(Some(item.parse()?)),
            None => Ok(None),
        }
    }

    /// Delete a session; `Ok(false)` when it was already gone.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        self.store.delete(&Session::key_for(id)).await
    }
}
