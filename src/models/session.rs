//! Session model

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::time::ts_format;
use crate::db::ItemKey;

/// Record type discriminator for session items
pub const RECORD_TYPE: &str = "session";

/// A browser session created after a successful OAuth login
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Session {
    /// Opaque session token handed to the client
    pub id: String,
    /// Owning user's provider id
    #[serde(rename = "userid")]
    pub user_id: String,
    /// Expiry instant, UTC
    #[serde(with = "ts_format")]
    pub expires: NaiveDateTime,
}

impl Session {
    /// Store key for a session id.
    pub fn key_for(id: &str) -> ItemKey {
        ItemKey::simple(format!("sessionid#{id}"))
    }

    pub fn key(&self) -> ItemKey {
        Self::key_for(&self.id)
    }

    /// Expired when the expiry instant has been reached.
    pub fn is_expired(&self, now: &NaiveDateTime) -> bool {
        self.expires <= *now
    }

    /// Post-login redirect target carrying the session token.
    pub fn redirect_location(&self, landing_url: &str) -> String {
        format!("{}?session={}", landing_url, self.id)
    }
}
