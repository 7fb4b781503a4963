//! Webex provider client
//!
//! Everything that crosses the network to Webex goes through the `Provider`
//! trait so handlers and the delivery job can be tested against a mock.

use async_trait::async_trait;
use serde::Deserialize;

/// A person as reported by the provider's directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Person {
    pub id: String,
    pub display_name: String,
    pub emails: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider returned status {0}")]
    Api(u16),
}

/// Operations the application needs from the messaging provider
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider login URL carrying the CSRF state token.
    fn authorize_url(&self, state: &str) -> String;

    /// Exchange an authorization code for an access token.
    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError>;

    /// Profile of the user owning the token.
    async fn me(&self, token: &str) -> Result<Person, ProviderError>;

    /// Directory search by display name.
    async fn list_people(&self, token: &str, query: &str) -> Result<Vec<Person>, ProviderError>;

    /// Send a text message to an email address.
    async fn send_message(&self, token: &str, email: &str, text: &str)
        -> Result<(), ProviderError>;
}

/// OAuth scopes requested at login
const SCOPES: &str = "spark%3Akms%20spark%3Apeople_read%20spark%3Amessages_write";

/// HTTP client for the Webex REST API
pub struct WebexClient {
    http: reqwest::Client,
    api_base: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl WebexClient {
    pub fn new(
        api_base: &str,
        client_id: &str,
        client_secret: &str,
        redirect_uri: &str,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            redirect_uri: redirect_uri.to_string(),
        }
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(ProviderError::Api(response.status().as_u16()))
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersonPayload {
    id: String,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    nick_name: Option<String>,
    #[serde(default)]
    emails: Vec<String>,
}

impl From<PersonPayload> for Person {
    fn from(p: PersonPayload) -> Self {
        // Prefer the short informal name when the directory has one
        let display_name = p
            .nick_name
            .filter(|n| !n.is_empty())
            .or(p.display_name)
            .unwrap_or_default();
        Person {
            id: p.id,
            display_name,
            emails: p.emails,
        }
    }
}

#[derive(Deserialize)]
struct PeoplePayload {
    items: Vec<PersonPayload>,
}

#[async_trait]
impl Provider for WebexClient {
    fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
            self.api_base,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            SCOPES,
            urlencoding::encode(state),
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .post(format!("{}/access_token", self.api_base))
            .form(&[
                ("grant_type", "authorization_code"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await?;

        let token: TokenResponse = Self::check(response)?.json().await?;
        Ok(token.access_token)
    }

    async fn me(&self, token: &str) -> Result<Person, ProviderError> {
        let response = self
            .http
            .get(format!("{}/people/me", self.api_base))
            .bearer_auth(token)
            .send()
            .await?;

        let payload: PersonPayload = Self::check(response)?.json().await?;
        Ok(payload.into())
    }

    async fn list_people(&self, token: &str, query: &str) -> Result<Vec<Person>, ProviderError> {
        let response = self
            .http
            .get(format!("{}/people", self.api_base))
            .query(&[("displayName", query)])
            .bearer_auth(token)
            .send()
            .await?;

        let payload: PeoplePayload = Self::check(response)?.json().await?;
        Ok(payload.items.into_iter().map(Person::from).collect())
    }

    async fn send_message(
        &self,
        token: &str,
        email: &str,
        text: &str,
    ) -> Result<(), ProviderError> {
        let response = self
            .http
            .post(format!("{}/messages", self.api_base))
            .bearer_auth(token)
            .json(&serde_json::json!({
                "toPersonEmail": email,
                "text": text,
            }))
            .send()
            .await?;

        Self::check(response)?;
        Ok(())
    }
}
