//! Domain models
//!
//! Records are serialized into the store's JSON `attrs` document, so the
//! serde field names here define the persisted schema.

pub mod message;
pub mod session;
pub mod time;
pub mod user;

pub use message::Message;
pub use session::Session;
pub use user::User;
