//! OAuth login flow
//!
//! Login is a two-leg OAuth authorization-code flow: `/wbxauth` hands out
//! the provider's login URL with a stored CSRF state token, and the provider
//! redirects back to `/auth` with a code. The callback verifies the state,
//! trades the code for an access token, enforces the email-domain allowlist
//! and ends with a live session.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::db::{ItemKey, ItemStore, StoreError, StoredItem};
use crate::models::time::{self, ts_format};
use crate::models::Session;
use crate::services::provider::{Provider, ProviderError};
use crate::services::session::SessionService;
use crate::services::user::UserService;

/// Record type discriminator for pending CSRF state tokens
const STATE_RECORD_TYPE: &str = "oauth_state";

/// A pending login's CSRF state token
#[derive(Debug, Serialize, Deserialize)]
struct StateRecord {
    #[serde(with = "ts_format")]
    created: chrono::NaiveDateTime,
}

fn state_key(token: &str) -> ItemKey {
    ItemKey::simple(format!("state#{token}"))
}

#[derive(Debug, thiserror::Error)]
pub enum AuthFlowError {
    #[error("state token missing or already used")]
    StateMismatch,

    #[error("email domain not in allowlist")]
    DomainNotAllowed,

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Drives the OAuth login flow end to end
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn ItemStore>,
    provider: Arc<dyn Provider>,
    sessions: SessionService,
    users: UserService,
    allowed_domains: Vec<String>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn ItemStore>,
        provider: Arc<dyn Provider>,
        sessions: SessionService,
        users: UserService,
        allowed_domains: Vec<String>,
    ) -> Self {
        Self {
            store,
            provider,
            sessions,
            users,
            allowed_domains,
        }
    }

    /// Provider login URL with a freshly stored CSRF state token.
    pub async fn authorize_url(&self) -> Result<String, AuthFlowError> {
        let token = SessionService::generate_token();
        let record = StateRecord { created: time::now() };
        let item = StoredItem::from_record(state_key(&token), STATE_RECORD_TYPE, &record)?;
        self.store.put(&item).await?;
        Ok(self.provider.authorize_url(&token))
    }

    /// Consume a state token; each token verifies at most one callback.
    async fn take_state(&self, token: &str) -> Result<bool, AuthFlowError> {
        let key = state_key(token);
        if self.store.get(&key).await?.is_none() {
            return Ok(false);
        }
        self.store.delete(&key).await?;
        Ok(true)
    }

    /// An empty allowlist admits everyone; otherwise the part after the last
    /// `@` must equal an allowed domain or be a subdomain of one.
    fn domain_allowed(&self, email: &str) -> bool {
        if self.allowed_domains.is_empty() {
            return true;
        }
        let Some((_, domain)) = email.rsplit_once('@') else {
            return false;
        };
        if domain.is_empty() {
            return false;
        }
        self.allowed_domains
            .iter()
            .any(|allowed| domain == allowed || domain.ends_with(&format!(".{allowed}")))
    }

    /// Handle the provider's redirect back: verify state, exchange the code,
    /// register or refresh the user, and return a live session.
    pub async fn handle_callback(
        &self,
        code: &str,
        state: &str,
    ) -> Result<Session, AuthFlowError> {
        if !self.take_state(state).await? {
            tracing::warn!("OAuth callback with unknown state token");
            return Err(AuthFlowError::StateMismatch);
        }

        let access_token = self.provider.exchange_code(code).await?;
        let person = self.provider.me(&access_token).await?;

        if !person.emails.iter().any(|e| self.domain_allowed(e)) {
            tracing::warn!(person = %person.id, "Login rejected by domain allowlist");
            return Err(AuthFlowError::DomainNotAllowed);
        }

        let user = match self.users.get(&person.id).await? {
            Some(_) => {
                self.users
                    .update_provider_token(&person.id, &access_token)
                    .await?
            }
            None => self.users.create(&person, &access_token).await?,
        };

        // Reuse the user's session when it is still live
        if let Some(session_id) = &user.session_id {
            match self.sessions.get(session_id).await? {
                Some(session) if !session.is_expired(&time::now()) => return Ok(session),
                Some(_) => {
                    self.sessions.delete(session_id).await?;
                }
                None => {}
            }
        }

        let session = self.sessions.create(&user.id).await?;
        self.users.add_session(&user.id, &session.id).await?;
        tracing::info!(user = %user.id, "Login completed");
        Ok(session)
    }
}
