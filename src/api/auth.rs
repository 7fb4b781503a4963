//! Login endpoints

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde_json::json;

use super::responses;
use super::AppState;
use crate::services::AuthFlowError;

/// `GET /wbxauth` - hand the frontend the provider login URL.
pub async fn wbxauth(State(state): State<AppState>) -> Response {
    match state.auth.authorize_url().await {
        Ok(location) => responses::ok(json!({"location": location})),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start login flow");
            responses::db_error()
        }
    }
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// `GET /auth` - the provider's redirect back. On success the browser is
/// sent on to the frontend with the new session token in the query string.
pub async fn callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return responses::failure(json!({"error": "Authorization error."}));
    };

    match state.auth.handle_callback(&code, &oauth_state).await {
        Ok(session) => (
            StatusCode::MOVED_PERMANENTLY,
            [(header::LOCATION, session.redirect_location(&state.landing_url))],
        )
            .into_response(),
        Err(AuthFlowError::StateMismatch) => {
            responses::failure(json!({"error": "Authorization error."}))
        }
        Err(AuthFlowError::DomainNotAllowed) => {
            responses::failure(json!({"error": "Not allowed."}))
        }
        Err(AuthFlowError::Provider(e)) => {
            tracing::warn!(error = %e, "Provider rejected the login");
            responses::failure(json!({"error": "Webex authorization failed."}))
        }
        Err(AuthFlowError::Store(e)) => {
            tracing::error!(error = %e, "Login failed on the store");
            responses::db_error()
        }
    }
}
