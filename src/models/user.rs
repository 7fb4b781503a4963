//! User model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::time::ts_format;
use crate::db::ItemKey;

/// Record type discriminator for user items
pub const RECORD_TYPE: &str = "user";

/// A registered user, keyed by their provider id
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Provider person id
    pub id: String,
    #[serde(rename = "displayname")]
    pub display_name: String,
    /// Provider API token used to act on the user's behalf
    #[serde(rename = "wbxtoken")]
    pub provider_token: String,
    /// Expiry of the provider token, UTC
    #[serde(rename = "wbxtoken_expires", with = "ts_format")]
    pub token_expires: NaiveDateTime,
    /// Currently active session, if any
    #[serde(
        rename = "sessionid",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,
    /// Ids of the user's scheduled messages
    #[serde(default)]
    pub messages: Vec<String>,
}

impl User {
    /// Store key for a user id.
    pub fn key_for(id: &str) -> ItemKey {
        ItemKey::simple(format!("userid#{id}"))
    }

    pub fn key(&self) -> ItemKey {
        Self::key_for(&self.id)
    }

    /// Token is unusable once its expiry instant has been reached.
    pub fn token_expired(&self, now: &NaiveDateTime) -> bool {
        self.token_expires <= *now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time;

    fn user() -> User {
        User {
            id: "person-1".to_string(),
            display_name: "Ann".to_string(),
            provider_token: "tok".to_string(),
            token_expires: time::parse("2024-06-14T10:00:00").expect("should parse"),
            session_id: None,
            messages: vec![],
        }
    }

    #[test]
    fn test_key_prefix() {
        assert_eq!(user().key().pk, "userid#person-1");
    }

    #[test]
    fn test_token_expiry_boundary() {
        let u = user();
        let at = time::parse("2024-06-14T10:00:00").expect("should parse");
        let before = time::parse("2024-06-14T09:59:59").expect("should parse");
        assert!(u.token_expired(&at));
        assert!(!u.token_expired(&before));
    }

    #[test]
    fn test_absent_session_is_omitted_and_defaulted() {
        let v = serde_json::to_value(user()).expect("should serialize");
        assert!(v.get("sessionid").is_none());

        // Records written before the messages list existed still parse
        let legacy = serde_json::json!({
            "id": "person-1",
            "displayname": "Ann",
            "wbxtoken": "tok",
            "wbxtoken_expires": "2024-06-14T10:00:00",
        });
        let parsed: User = serde_json::from_value(legacy).expect("should parse");
        assert_eq!(parsed.session_id, None);
        assert!(parsed.messages.is_empty());
    }

    #[test]
    fn test_persisted_field_names() {
        let mut u = user();
        u.session_id = Some("s1".to_string());
        u.messages = vec!["m1".to_string()];
        let v = serde_json::to_value(&u).expect("should serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "id": "person-1",
                "displayname": "Ann",
                "wbxtoken": "tok",
                "wbxtoken_expires": "2024-06-14T10:00:00",
                "sessionid": "s1",
                "messages": ["m1"],
            })
        );
    }
}
