//! Scheduled message model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::time::{self, ts_format};
use crate::db::ItemKey;

/// Record type discriminator for message items
pub const RECORD_TYPE: &str = "message";

/// A message scheduled for future delivery
///
/// The sort key is the delivery timestamp, so the delivery scanner can pick
/// up a whole hour of due messages with one prefix query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    #[serde(rename = "messageid")]
    pub id: String,
    /// Scheduling user's provider id
    #[serde(rename = "userid")]
    pub user_id: String,
    /// Recipient email address
    #[serde(rename = "person")]
    pub recipient: String,
    /// Message text
    #[serde(rename = "msg")]
    pub body: String,
    /// Delivery instant, UTC
    #[serde(rename = "time", with = "ts_format")]
    pub deliver_at: NaiveDateTime,
}

impl Message {
    /// Fresh random message id.
    pub fn new_id() -> String {
        Uuid::new_v4().simple().to_string()
    }

    /// Partition key for a message id.
    pub fn partition_for(id: &str) -> String {
        format!("message#{id}")
    }

    pub fn key(&self) -> ItemKey {
        ItemKey {
            pk: Self::partition_for(&self.id),
            sk: time::format(&self.deliver_at),
        }
    }

    /// Due once the delivery instant has been reached.
    pub fn is_due(&self, now: &NaiveDateTime) -> bool {
        self.deliver_at <= *now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(deliver_at: &str) -> Message {
        Message {
            id: "m1".to_string(),
            user_id: "person-1".to_string(),
            recipient: "bob@example.com".to_string(),
            body: "hello".to_string(),
            deliver_at: time::parse(deliver_at).expect("should parse"),
        }
    }

    #[test]
    fn test_key_uses_delivery_time_as_sort_key() {
        let key = message("2024-06-01T10:15:00").key();
        assert_eq!(key.pk, "message#m1");
        assert_eq!(key.sk, "2024-06-01T10:15:00");
    }

    #[test]
    fn test_due_boundary() {
        let m = message("2024-06-01T10:15:00");
        let at = time::parse("2024-06-01T10:15:00").expect("should parse");
        let before = time::parse("2024-06-01T10:14:59").expect("should parse");
        assert!(m.is_due(&at));
        assert!(!m.is_due(&before));
    }

    #[test]
    fn test_new_id_is_32_hex_chars() {
        let id = Message::new_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_persisted_field_names() {
        let v = serde_json::to_value(message("2024-06-01T10:15:00")).expect("should serialize");
        assert_eq!(
            v,
            serde_json::json!({
                "messageid": "m1",
                "userid": "person-1",
                "person": "bob@example.com",
                "msg": "hello",
                "time": "2024-06-01T10:15:00",
            })
        );
    }
}
