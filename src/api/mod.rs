//! API layer - HTTP handlers and routing
//!
//! Endpoints:
//! - `GET /wbxauth` - provider login URL
//! - `GET /auth` - OAuth callback, redirects to the frontend with a session
//! - `GET /user` / `DELETE /user` - profile and account deletion
//! - `GET /logout` - session revocation
//! - `POST /schedule` - schedule a message
//! - `GET /messages` - pending messages
//! - `DELETE /message` - cancel a message
//! - `GET /people` - provider directory search

pub mod auth;
pub mod messages;
pub mod people;
pub mod responses;
pub mod users;

use std::sync::Arc;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use axum::response::Response;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::models::{time, Session};
use crate::services::{
    AuthService, MessageService, Provider, SessionService, UserService,
};

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub users: UserService,
    pub messages: MessageService,
    pub auth: AuthService,
    pub provider: Arc<dyn Provider>,
    pub landing_url: String,
}

/// Resolve a session token from the query string.
///
/// A missing, unknown or expired token answers `Session Expired.`; an
/// expired session record is deleted on sight.
pub async fn require_session(
    state: &AppState,
    session_id: Option<&str>,
) -> Result<Session, Response> {
    let Some(session_id) = session_id else {
        return Err(responses::session_expired());
    };

    let session = match state.sessions.get(session_id).await {
        Ok(session) => session,
        Err(_) => return Err(responses::db_error()),
    };
    let Some(session) = session else {
        return Err(responses::session_expired());
    };

    if session.is_expired(&time::now()) {
        if let Err(e) = state.sessions.delete(&session.id).await {
            tracing::error!(error = %e, "Failed to delete expired session");
        }
        return Err(responses::session_expired());
    }

    Ok(session)
}

/// Build the application router with CORS and request tracing.
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/wbxauth", get(auth::wbxauth))
        .route("/auth", get(auth::callback))
        .route("/user", get(users::get_user).delete(users::delete_user))
        .route("/logout", get(users::logout))
        .route("/schedule", post(messages::schedule))
        .route("/messages", get(messages::list_messages))
        .route("/message", delete(messages::delete_message))
        .route("/people", get(people::search))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::db::{create_test_pool, migrations, ItemStore, SqlxItemStore};
    use crate::services::provider::mock::MockProvider;
    use axum_test::TestServer;

    pub struct TestApp {
        pub server: TestServer,
        pub state: AppState,
        pub store: Arc<dyn ItemStore>,
        pub provider: Arc<MockProvider>,
    }

    /// Spin up the full router against an in-memory store and mock provider.
    pub async fn spawn(provider: MockProvider) -> TestApp {
        let pool = create_test_pool().await.expect("Failed to create pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        let store = SqlxItemStore::boxed(pool);

        let provider = Arc::new(provider);
        let sessions = SessionService::new(store.clone(), 2);
        let users = UserService::new(store.clone(), 13);
        let messages = MessageService::new(store.clone());
        let auth = AuthService::new(
            store.clone(),
            provider.clone(),
            sessions.clone(),
            users.clone(),
            vec![],
        );

        let state = AppState {
            sessions,
            users,
            messages,
            auth,
            provider: provider.clone(),
            landing_url: "https://app.example.com/index.html".to_string(),
        };

        let router = build_router(state.clone(), "http://localhost:3000")
            .expect("Failed to build router");
        let server = TestServer::new(router).expect("Failed to start test server");
        TestApp {
            server,
            state,
            store,
            provider,
        }
    }
}
