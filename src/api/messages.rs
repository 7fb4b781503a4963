//! Message scheduling endpoints

use axum::extract::{Query, State};
use axum::response::Response;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::responses;
use super::users::SessionQuery;
use super::{require_session, AppState};
use crate::models::time;

#[derive(Deserialize)]
pub struct ScheduleRequest {
    /// Message text
    msg: String,
    /// Local wall-clock delivery time
    time: String,
    /// Recipient email address
    person: String,
    /// IANA timezone the delivery time is expressed in
    timezone: String,
}

/// `POST /schedule?session=` - schedule a message for future delivery.
pub async fn schedule(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
    Json(request): Json<ScheduleRequest>,
) -> Response {
    // Validate before touching the session so the caller learns about a bad
    // timestamp even with a stale token
    let deliver_at = match time::parse(&request.time)
        .and_then(|local| time::to_utc(&local, &request.timezone))
    {
        Ok(deliver_at) => deliver_at,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected schedule request");
            return responses::failure(json!({"error": "Invalid time or timezone."}));
        }
    };

    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let message = match state
        .messages
        .schedule(&session.user_id, &request.person, &request.msg, deliver_at)
        .await
    {
        Ok(message) => message,
        Err(e) => {
            tracing::error!(error = %e, "Failed to store message");
            return responses::db_error();
        }
    };

    if let Err(e) = state.users.add_message(&session.user_id, &message.id).await {
        tracing::error!(error = %e, "Failed to link message to user");
        return responses::db_error();
    }

    responses::ok_empty()
}

/// `GET /messages?session=` - the user's still-pending messages.
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Response {
    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let user = match state.users.get(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return responses::ok(json!([])),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            return responses::db_error();
        }
    };

    match state.messages.list_for_user(&user).await {
        Ok(messages) => {
            let now = time::now();
            let pending: Vec<_> = messages.into_iter().filter(|m| !m.is_due(&now)).collect();
            responses::ok(pending)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to list messages");
            responses::db_error()
        }
    }
}

#[derive(Deserialize)]
pub struct DeleteMessageQuery {
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// `DELETE /message?session=&message=` - cancel a scheduled message.
pub async fn delete_message(
    State(state): State<AppState>,
    Query(query): Query<DeleteMessageQuery>,
) -> Response {
    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    let Some(message_id) = query.message else {
        return responses::ok("Message does not exist.");
    };

    let message = match state.messages.get(&message_id).await {
        Ok(Some(message)) => message,
        // Deleting something already gone is not an error
        Ok(None) => return responses::ok("Message does not exist."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load message");
            return responses::db_error();
        }
    };

    match state.messages.delete(&message).await {
        Ok(true) => {
            if let Err(e) = state
                .users
                .remove_message(&session.user_id, &message_id)
                .await
            {
                tracing::error!(error = %e, "Failed to unlink message from user");
                return responses::db_error();
            }
            responses::ok("Message deleted.")
        }
        Ok(false) => responses::failure("Message not deleted."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to delete message");
            responses::db_error()
        }
    }
}
