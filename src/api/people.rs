//! Directory search endpoint

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;
use serde_json::json;

use super::responses;
use super::{require_session, AppState};
use crate::models::time;

#[derive(Deserialize)]
pub struct PeopleQuery {
    #[serde(default)]
    session: Option<String>,
    #[serde(default)]
    q: String,
}

/// `GET /people?session=&q=` - search the provider directory by name.
///
/// The query is restricted to letters and whitespace; anything else skips
/// the provider call and answers `No results.` like an empty search would.
pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<PeopleQuery>,
) -> Response {
    let session = match require_session(&state, query.session.as_deref()).await {
        Ok(session) => session,
        Err(response) => return response,
    };

    if !query.q.chars().all(|c| c.is_alphabetic() || c.is_whitespace()) {
        return responses::failure("No results.");
    }

    let user = match state.users.get(&session.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return responses::failure("No results."),
        Err(e) => {
            tracing::error!(error = %e, "Failed to load user");
            return responses::db_error();
        }
    };

    if user.token_expired(&time::now()) {
        return responses::failure("No results.");
    }

    let people = match state.provider.list_people(&user.provider_token, &query.q).await {
        Ok(people) => people,
        Err(e) => {
            tracing::warn!(error = %e, "Directory search failed");
            return responses::failure("No results.");
        }
    };

    let results: Vec<_> = people
        .iter()
        .filter_map(|p| {
            p.emails.first().map(|email| {
                json!({"displayname": p.display_name, "email": email})
            })
        })
        .collect();

    if results.is_empty() {
        responses::failure("No results.")
    } else {
        responses::ok(results)
    }
}
