//! Business logic services
//!
//! Services own the domain rules and talk to the store through the
//! `ItemStore` trait; handlers stay thin and map service results onto the
//! wire format.

pub mod auth;
pub mod delivery;
pub mod message;
pub mod provider;
pub mod session;
pub mod user;

pub use auth::{AuthFlowError, AuthService};
pub use delivery::{DeliveryReport, DeliveryService};
pub use message::MessageService;
pub use provider::{Person, Provider, ProviderError, WebexClient};
pub use session::SessionService;
pub use user::UserService;
