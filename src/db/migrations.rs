//! Database migrations
//!
//! Migrations are embedded directly in Rust code as SQL strings for
//! single-binary deployment. Applied versions are tracked in a
//! `_migrations` table.

use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Executor, Row, SqlitePool};

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (unique and sequential)
    pub version: i64,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements to apply
    pub up: &'static str,
}

/// All migrations, in order.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: the single items table plus the (record_type, sk)
    // secondary index the delivery scanner queries by time-bucket prefix.
    Migration {
        version: 1,
        name: "create_items",
        up: r#"
            CREATE TABLE IF NOT EXISTS items (
                pk          TEXT NOT NULL,
                sk          TEXT NOT NULL,
                record_type TEXT NOT NULL DEFAULT '',
                attrs       TEXT NOT NULL,
                PRIMARY KEY (pk, sk)
            );
            CREATE INDEX IF NOT EXISTS idx_items_record_type_sk
                ON items(record_type, sk);
        "#,
    },
];

/// Run all pending migrations against the pool.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TIMESTAMP NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create migrations table")?;

    let applied: Vec<i64> = sqlx::query("SELECT version FROM _migrations")
        .fetch_all(pool)
        .await
        .context("Failed to read applied migrations")?
        .iter()
        .map(|row| row.get::<i64, _>("version"))
        .collect();

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        pool.execute(migration.up)
            .await
            .with_context(|| format!("Failed to apply migration '{}'", migration.name))?;

        sqlx::query("INSERT INTO _migrations (version, name, applied_at) VALUES (?, ?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .bind(Utc::now())
            .execute(pool)
            .await
            .with_context(|| format!("Failed to record migration '{}'", migration.name))?;

        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applied migration"
        );
    }

    Ok(())
}
