//! User and session endpoints

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::responses;
use super::{require_session, AppState};

#[derive(Deserialize)]
pub struct SessionQuery {
    #[serde(default)]
    pub session: Option<String>,
}

/// `GET /user` - display name of the session's owner.
pub async fn get_user(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    match state.users.get(&session.user_id).await {
        Ok(Some(user)) => responses::ok(json!({"username": user.display_name})),
        Ok(None) => {
            tracing::error!(user = %session.user_id, "Session points at a missing user");
            responses::db_error()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            responses::db_error()
        }
    }
}

/// `DELETE /user` - delete the account and every scheduled message.
pub async fn delete_user(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let user = match state.users.get(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return responses::failure("User not deleted."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            return responses::db_error();
        }
    };

    // Cascade: the user's messages go first
    for message_id in &user.messages {
        match state.messages.get(message_id).await {
            Ok(Some(message)) => {
                if let Err(e) = state.messages.delete(&message).await {
                    tracing::error!(error = %e, message = %message_id, "Failed to delete message");
                    return responses::db_error();
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!(error = %e, "Failed to load message");
                return responses::db_error();
            }
        }
    }

    match state.users.delete(&user.id).await {
        Ok(true) => responses::ok("User deleted."),
        Ok(false) => responses::failure("User not deleted."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete user");
            responses::db_error()
        }
    }
}

/// `GET /logout` - revoke the session.
pub async fn logout(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let Some(session_id) = query.session else {
        return responses::ok_empty();
    };

    match state.sessions.delete(&session_id).await {
        Ok(_) => responses::ok_empty(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete session");
            responses::db_error()
        }
    }
}
