//! One-shot delivery run, for cron-style operation without the web server.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sendlater::{
    config::Config,
    db::{self, SqlxItemStore},
    services::{DeliveryService, MessageService, UserService, WebexClient},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sendlater=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_with_env(Path::new("config.yml"))?;

    let pool = db::create_pool(&config.database).await?;
    db::migrations::run_migrations(&pool).await?;

    let store = SqlxItemStore::boxed(pool);
    let provider = Arc::new(WebexClient::new(
        &config.oauth.api_base,
        &config.oauth.client_id,
        &config.oauth.client_secret,
        &config.oauth.redirect_uri,
    ));
    let users = UserService::new(store.clone(), config.provider_token.ttl_days);
    let messages = MessageService::new(store);

    let delivery = DeliveryService::new(users, messages, provider);
    let report = delivery.run_once().await?;
    tracing::info!(
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "Delivery run finished"
    );

    Ok(())
}
