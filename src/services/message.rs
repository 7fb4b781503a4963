//! Message service

use std::sync::Arc;

use chrono::NaiveDateTime;

use crate::db::{ItemStore, StoreError, StoredItem};
use crate::models::message::{Message, RECORD_TYPE};
use crate::models::User;

/// Stores and retrieves scheduled messages
#[derive(Clone)]
pub struct MessageService {
    store: Arc<dyn ItemStore>,
}

impl MessageService {
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Persist a new scheduled message and return it with its fresh id.
    pub async fn schedule(
        &self,
        user_id: &str,
        recipient: &str,
        body: &str,
        deliver_at: NaiveDateTime,
    ) -> Result<Message, StoreError> {
        let message = Message {
            id: Message::new_id(),
            user_id: user_id.to_string(),
            recipient: recipient.to_string(),
            body: body.to_string(),
            deliver_at,
        };

        let item = StoredItem::from_record(message.key(), RECORD_TYPE, &message)?;
        self.store.put(&item).await?;
        Ok(message)
    }

    /// Fetch a message by id.
    ///
    /// The sort key is the delivery time, which the caller rarely has, so
    /// this reads the whole single-item partition.
    pub async fn get(&self, id: &str) -> Result<Option<Message>, StoreError> {
        let items = self
            .store
            .query_partition(&Message::partition_for(id))
            .await?;
        match items.first() {
            Some(item) => Ok(Some(item.parse()?)),
            None => Ok(None),
        }
    }

    /// Delete a message record; `Ok(false)` when already gone.
    pub async fn delete(&self, message: &Message) -> Result<bool, StoreError> {
        self.store.delete(&message.key()).await
    }

    /// All messages referenced by a user record, skipping dangling ids.
    pub async fn list_for_user(&self, user: &User) -> Result<Vec<Message>, StoreError> {
        let mut messages = Vec::with_capacity(user.messages.len());
        for id in &user.messages {
            if let Some(message) = self.get(id).await? {
                messages.push(message);
            }
        }
        Ok(messages)
    }

    /// All messages whose delivery time falls inside the given hour bucket.
    pub async fn due_in_bucket(&self, bucket: &str) -> Result<Vec<Message>, StoreError> {
        let items = self.store.query_type_prefix(RECORD_TYPE, bucket).await?;
        items.iter().map(|item| item.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, SqlxItemStore};
    use crate::models::time;

    async fn setup() -> MessageService {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        MessageService::new(SqlxItemStore::boxed(pool))
    }

    fn at(s: &str) -> NaiveDateTime {
        time::parse(s).expect("should parse")
    }

    #[tokio::test]
    async fn test_schedule_and_get() {
        let messages = setup().await;
        let scheduled = messages
            .schedule("person-1", "bob@example.com", "hello", at("2024-06-01T10:15:00"))
            .await
            .expect("schedule failed");
        assert_eq!(scheduled.id.len(), 32);

        let fetched = messages
            .get(&scheduled.id)
            .await
            .expect("get failed")
            .expect("message missing");
        assert_eq!(fetched, scheduled);
    }

    #[tokio::test]
    async fn test_get_absent_is_none() {
        let messages = setup().await;
        assert!(messages.get("nope").await.expect("get failed").is_none());
    }

    #[tokio::test]
    async fn test_list_for_user_skips_dangling_ids() {
        let messages = setup().await;
        let scheduled = messages
            .schedule("person-1", "bob@example.com", "hello", at("2024-06-01T10:15:00"))
            .await
            .expect("schedule failed");

        let user = User {
            id: "person-1".to_string(),
            display_name: "Ann".to_string(),
            provider_token: "tok".to_string(),
            token_expires: at("2024-06-14T00:00:00"),
            session_id: None,
            messages: vec![scheduled.id.clone(), "dangling".to_string()],
        };

        let listed = messages.list_for_user(&user).await.expect("list failed");
        assert_eq!(listed, vec![scheduled]);
    }

    #[tokio::test]
    async fn test_due_in_bucket_only_matches_that_hour() {
        let messages = setup().await;
        let in_bucket = messages
            .schedule("person-1", "bob@example.com", "a", at("2024-06-01T10:15:00"))
            .await
            .expect("schedule failed");
        messages
            .schedule("person-1", "bob@example.com", "b", at("2024-06-01T11:15:00"))
            .await
            .expect("schedule failed");

        let due = messages
            .due_in_bucket(&time::hour_bucket(&at("2024-06-01T10:00:00")))
            .await
            .expect("query failed");
        assert_eq!(due, vec![in_bucket]);
    }

    #[tokio::test]
    async fn test_delete() {
        let messages = setup().await;
        let scheduled = messages
            .schedule("person-1", "bob@example.com", "hello", at("2024-06-01T10:15:00"))
            .await
            .expect("schedule failed");

        assert!(messages.delete(&scheduled).await.expect("delete failed"));
        assert!(messages.get(&scheduled.id).await.expect("get failed").is_none());
    }
}
