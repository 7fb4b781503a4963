//! sendlater - schedule Webex messages for future delivery

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sendlater::{
    api::{self, AppState},
    config::Config,
    db::{self, SqlxItemStore},
    services::{
        AuthService, DeliveryService, MessageService, SessionService, UserService, WebexClient,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sendlater=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sendlater...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database ready: {}", config.database.url);

    // Store and services
    let store = SqlxItemStore::boxed(pool);
    let provider = Arc::new(WebexClient::new(
        &config.oauth.api_base,
        &config.oauth.client_id,
        &config.oauth.client_secret,
        &config.oauth.redirect_uri,
    ));
    let sessions = SessionService::new(store.clone(), config.sessions.ttl_hours);
    let users = UserService::new(store.clone(), config.provider_token.ttl_days);
    let messages = MessageService::new(store.clone());
    let auth = AuthService::new(
        store,
        provider.clone(),
        sessions.clone(),
        users.clone(),
        config.oauth.allowed_domains.clone(),
    );

    // Background delivery loop
    {
        let delivery = DeliveryService::new(users.clone(), messages.clone(), provider.clone());
        let interval_secs = config.delivery.interval_secs;
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
            loop {
                interval.tick().await;
                match delivery.run_once().await {
                    Ok(report) => tracing::info!(
                        sent = report.sent,
                        skipped = report.skipped,
                        failed = report.failed,
                        "Delivery run finished"
                    ),
                    Err(e) => tracing::error!(error = %e, "Delivery run failed"),
                }
            }
        });
    }

    // Build application state and router
    let state = AppState {
        sessions,
        users,
        messages,
        auth,
        provider,
        landing_url: config.landing_url(),
    };
    let app = api::build_router(state, &config.server.cors_origin)?;

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
