//! User service

use std::sync::Arc;

use chrono::Duration;
use serde_json::json;

use crate::db::{ItemStore, StoreError, StoredItem};
use crate::models::user::{User, RECORD_TYPE};
use crate::models::time;
use crate::services::provider::Person;

/// Manages user records and their session/message references
#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn ItemStore>,
    token_ttl: Duration,
}

impl UserService {
    pub fn new(store: Arc<dyn ItemStore>, token_ttl_days: i64) -> Self {
        Self {
            store,
            token_ttl: Duration::days(token_ttl_days),
        }
    }

    /// Register a new user from their provider profile and token.
    pub async fn create(&self, person: &Person, provider_token: &str) -> Result<User, StoreError> {
        let user = User {
            id: person.id.clone(),
            display_name: person.display_name.clone(),
            provider_token: provider_token.to_string(),
            token_expires: time::now() + self.token_ttl,
            session_id: None,
            messages: vec![],
        };

        let item = StoredItem::from_record(user.key(), RECORD_TYPE, &user)?;
        self.store.put(&item).await?;
        self.require(&user.id).await
    }

    pub async fn get(&self, id: &str) -> Result<Option<User>, StoreError> {
        match self.store.get(&User::key_for(id)).await? {
            Some(item) => Ok(Some(item.parse()?)),
            None => Ok(None),
        }
    }

    async fn require(&self, id: &str) -> Result<User, StoreError> {
        self.get(id).await?.ok_or_else(|| StoreError::Corrupt {
            pk: User::key_for(id).pk,
            reason: "user vanished after write".to_string(),
        })
    }

    /// Point the user record at a new active session.
    pub async fn add_session(&self, user_id: &str, session_id: &str) -> Result<User, StoreError> {
        self.store
            .update(
                &User::key_for(user_id),
                vec![("sessionid".to_string(), json!(session_id))],
                vec![],
            )
            .await?;
        self.require(user_id).await
    }

    /// Clear the user's active-session reference.
    pub async fn remove_session(&self, user_id: &str) -> Result<User, StoreError> {
        self.store
            .update(&User::key_for(user_id), vec![], vec!["sessionid".to_string()])
            .await?;
        self.require(user_id).await
    }

    /// Replace the stored provider token and restart its expiry clock.
    pub async fn update_provider_token(
        &self,
        user_id: &str,
        provider_token: &str,
    ) -> Result<User, StoreError> {
        let expires = time::now() + self.token_ttl;
        self.store
            .update(
                &User::key_for(user_id),
                vec![
                    ("wbxtoken".to_string(), json!(provider_token)),
                    ("wbxtoken_expires".to_string(), json!(time::format(&expires))),
                ],
                vec![],
            )
            .await?;
        self.require(user_id).await
    }

    /// Append a message id to the user's list.
    ///
    /// The append is unconditional; a repeated id produces a duplicate entry
    /// rather than failing the caller.
    pub async fn add_message(&self, user_id: &str, message_id: &str) -> Result<User, StoreError> {
        self.store
            .list_append(&User::key_for(user_id), "messages", &json!(message_id))
            .await?;
        self.require(user_id).await
    }

    /// Drop a message id from the user's list.
    ///
    /// Read-filter-write: concurrent appends between the read and the write
    /// can be lost, which the delivery path tolerates.
    pub async fn remove_message(&self, user_id: &str, message_id: &str) -> Result<User, StoreError> {
        let user = self.require(user_id).await?;
        let remaining: Vec<&String> = user
            .messages
            .iter()
            .filter(|id| id.as_str() != message_id)
            .collect();

        self.store
            .update(
                &User::key_for(user_id),
                vec![("messages".to_string(), json!(remaining))],
                vec![],
            )
            .await?;
        self.require(user_id).await
    }

    pub async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        self.store.delete(&User::key_for(user_id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{create_test_pool, migrations, SqlxItemStore};

    async fn setup() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        UserService::new(SqlxItemStore::boxed(pool), 13)
    }

    fn person() -> Person {
        Person {
            id: "person-1".to_string(),
            display_name: "Ann".to_string(),
            emails: vec!["ann@example.com".to_string()],
        }
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let users = setup().await;
        let created = users.create(&person(), "tok").await.expect("create failed");
        assert_eq!(created.id, "person-1");
        assert_eq!(created.display_name, "Ann");
        assert_eq!(created.provider_token, "tok");
        assert!(created.messages.is_empty());
        assert!(created.session_id.is_none());

        let fetched = users
            .get("person-1")
            .await
            .expect("get failed")
            .expect("user missing");
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_session_reference_lifecycle() {
        let users = setup().await;
        users.create(&person(), "tok").await.expect("create failed");

        let with_session = users
            .add_session("person-1", "s1")
            .await
            .expect("add_session failed");
        assert_eq!(with_session.session_id.as_deref(), Some("s1"));

        let without = users
            .remove_session("person-1")
            .await
            .expect("remove_session failed");
        assert_eq!(without.session_id, None);
    }

    #[tokio::test]
    async fn test_update_provider_token_restarts_expiry() {
        let users = setup().await;
        let created = users.create(&person(), "old").await.expect("create failed");

        let updated = users
            .update_provider_token("person-1", "new")
            .await
            .expect("update failed");
        assert_eq!(updated.provider_token, "new");
        assert!(updated.token_expires >= created.token_expires);
    }

    #[tokio::test]
    async fn test_message_list_append_and_remove() {
        let users = setup().await;
        users.create(&person(), "tok").await.expect("create failed");

        users.add_message("person-1", "m1").await.expect("append failed");
        let u = users.add_message("person-1", "m2").await.expect("append failed");
        assert_eq!(u.messages, vec!["m1", "m2"]);

        let u = users
            .remove_message("person-1", "m1")
            .await
            .expect("remove failed");
        assert_eq!(u.messages, vec!["m2"]);

        // Removing an id that is not there leaves the list untouched
        let u = users
            .remove_message("person-1", "m9")
            .await
            .expect("remove failed");
        assert_eq!(u.messages, vec!["m2"]);
    }

    #[tokio::test]
    async fn test_duplicate_append_is_kept() {
        let users = setup().await;
        users.create(&person(), "tok").await.expect("create failed");

        users.add_message("person-1", "m1").await.expect("append failed");
        let u = users.add_message("person-1", "m1").await.expect("append failed");
        assert_eq!(u.messages, vec!["m1", "m1"]);
    }

    #[tokio::test]
    async fn test_delete() {
        let users = setup().await;
        users.create(&person(), "tok").await.expect("create failed");

        assert!(users.delete("person-1").await.expect("delete failed"));
        assert!(users.get("person-1").await.expect("get failed").is_none());
        assert!(!users.delete("person-1").await.expect("second delete failed"));
    }
}
