//! Item access layer
//!
//! Generic, entity-agnostic operations against the single `items` table,
//! addressed by a two-part `(pk, sk)` key. Record fields live in a JSON
//! `attrs` document; partial updates and list appends are performed with
//! SQLite's JSON functions so each mutation stays a single atomic row write.
//!
//! Error policy: every store fault is logged here and surfaced as a uniform
//! `StoreError`. An absent key is `Ok(None)` / `Ok(false)`, never an error.

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sqlx::{Row, SqlitePool};

/// Composite key identifying one stored item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemKey {
    /// Partition key
    pub pk: String,
    /// Sort key
    pub sk: String,
}

impl ItemKey {
    /// Key for records whose sort key equals the partition key
    /// (sessions, users, OAuth state).
    pub fn simple(pk: impl Into<String>) -> Self {
        let pk = pk.into();
        Self {
            sk: pk.clone(),
            pk,
        }
    }
}

/// A raw record as stored in the items table
#[derive(Debug, Clone)]
pub struct StoredItem {
    pub pk: String,
    pub sk: String,
    pub record_type: String,
    pub attrs: serde_json::Value,
}

impl StoredItem {
    /// Build a stored item from a typed record.
    pub fn from_record<T: Serialize>(
        key: ItemKey,
        record_type: &str,
        record: &T,
    ) -> Result<Self, StoreError> {
        let attrs = serde_json::to_value(record).map_err(|e| StoreError::Corrupt {
            pk: key.pk.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            pk: key.pk,
            sk: key.sk,
            record_type: record_type.to_string(),
            attrs,
        })
    }

    /// Deserialize the attrs document into a typed record.
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        serde_json::from_value(self.attrs.clone()).map_err(|e| StoreError::Corrupt {
            pk: self.pk.clone(),
            reason: e.to_string(),
        })
    }
}

/// Uniform error for any store transport/record fault
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store operation failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt record at '{pk}': {reason}")]
    Corrupt { pk: String, reason: String },
}

/// Key-value store operations shared by all record types
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Get one item by key; absent keys yield `Ok(None)`.
    async fn get(&self, key: &ItemKey) -> Result<Option<StoredItem>, StoreError>;

    /// Unconditional upsert; last writer wins.
    async fn put(&self, item: &StoredItem) -> Result<(), StoreError>;

    /// All items of one partition, ordered by sort key.
    async fn query_partition(&self, pk: &str) -> Result<Vec<StoredItem>, StoreError>;

    /// Secondary-index scan: all items of one record type whose sort key
    /// begins with the given prefix, ordered by sort key.
    async fn query_type_prefix(
        &self,
        record_type: &str,
        sk_prefix: &str,
    ) -> Result<Vec<StoredItem>, StoreError>;

    /// Partial update: set the named fields and remove the named fields in
    /// one atomic row write.
    async fn update(
        &self,
        key: &ItemKey,
        set: Vec<(String, serde_json::Value)>,
        remove: Vec<String>,
    ) -> Result<(), StoreError>;

    /// Atomically append a value to a list field.
    async fn list_append(
        &self,
        key: &ItemKey,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError>;

    /// Idempotent delete; `Ok(false)` when the key was already absent.
    async fn delete(&self, key: &ItemKey) -> Result<bool, StoreError>;
}

/// SQLx-backed item store over the SQLite items table
pub struct SqlxItemStore {
    pool: SqlitePool,
}

impl SqlxItemStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a shared store for dependency injection.
    pub fn boxed(pool: SqlitePool) -> Arc<dyn ItemStore> {
        Arc::new(Self::new(pool))
    }
}

fn log_db_error(op: &str, e: &sqlx::Error) {
    tracing::error!(op, error = %e, "store operation failed");
}

fn row_to_item(row: &sqlx::sqlite::SqliteRow) -> Result<StoredItem, StoreError> {
    let pk: String = row.get("pk");
    let attrs_text: String = row.get("attrs");
    let attrs = serde_json::from_str(&attrs_text).map_err(|e| StoreError::Corrupt {
        pk: pk.clone(),
        reason: e.to_string(),
    })?;
    Ok(StoredItem {
        pk,
        sk: row.get("sk"),
        record_type: row.get("record_type"),
        attrs,
    })
}

#[async_trait]
impl ItemStore for SqlxItemStore {
    async fn get(&self, key: &ItemKey) -> Result<Option<StoredItem>, StoreError> {
        let row = sqlx::query("SELECT pk, sk, record_type, attrs FROM items WHERE pk = ? AND sk = ?")
            .bind(&key.pk)
            .bind(&key.sk)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                log_db_error("get", &e);
                StoreError::from(e)
            })?;

        match row {
            Some(row) => Ok(Some(row_to_item(&row)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, item: &StoredItem) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT OR REPLACE INTO items (pk, sk, record_type, attrs) VALUES (?, ?, ?, ?)",
        )
        .bind(&item.pk)
        .bind(&item.sk)
        .bind(&item.record_type)
        .bind(item.attrs.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            log_db_error("put", &e);
            StoreError::from(e)
        })?;

        Ok(())
    }

    async fn query_partition(&self, pk: &str) -> Result<Vec<StoredItem>, StoreError> {
        let rows = sqlx::query(
            "SELECT pk, sk, record_type, attrs FROM items WHERE pk = ? ORDER BY sk ASC",
        )
        .bind(pk)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log_db_error("query_partition", &e);
            StoreError::from(e)
        })?;

        rows.iter().map(row_to_item).collect()
    }

    async fn query_type_prefix(
        &self,
        record_type: &str,
        sk_prefix: &str,
    ) -> Result<Vec<StoredItem>, StoreError> {
        // Prefixes are timestamp fragments, so no LIKE metacharacters
        let rows = sqlx::query(
            r#"
            SELECT pk, sk, record_type, attrs FROM items
            WHERE record_type = ? AND sk LIKE ? || '%'
            ORDER BY sk ASC
            "#,
        )
        .bind(record_type)
        .bind(sk_prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            log_db_error("query_type_prefix", &e);
            StoreError::from(e)
        })?;

        rows.iter().map(row_to_item).collect()
    }

    async fn update(
        &self,
        key: &ItemKey,
        set: Vec<(String, serde_json::Value)>,
        remove: Vec<String>,
    ) -> Result<(), StoreError> {
        if set.is_empty() && remove.is_empty() {
            return Ok(());
        }

        let mut expr = String::from("attrs");
        if !set.is_empty() {
            let pairs = vec!["?, json(?)"; set.len()].join(", ");
            expr = format!("json_set({expr}, {pairs})");
        }
        if !remove.is_empty() {
            let paths = vec!["?"; remove.len()].join(", ");
            expr = format!("json_remove({expr}, {paths})");
        }
        let sql = format!("UPDATE items SET attrs = {expr} WHERE pk = ? AND sk = ?");

        let mut query = sqlx::query(&sql);
        for (field, value) in &set {
            query = query.bind(format!("$.{field}")).bind(value.to_string());
        }
        for field in &remove {
            query = query.bind(format!("$.{field}"));
        }
        query = query.bind(&key.pk).bind(&key.sk);

        query.execute(&self.pool).await.map_err(|e| {
            log_db_error("update", &e);
            StoreError::from(e)
        })?;

        Ok(())
    }

    async fn list_append(
        &self,
        key: &ItemKey,
        field: &str,
        value: &serde_json::Value,
    ) -> Result<(), StoreError> {
        sqlx::query("UPDATE items SET attrs = json_insert(attrs, ?, json(?)) WHERE pk = ? AND sk = ?")
            .bind(format!("$.{field}[#]"))
            .bind(value.to_string())
            .bind(&key.pk)
            .bind(&key.sk)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log_db_error("list_append", &e);
                StoreError::from(e)
            })?;

        Ok(())
    }

    async fn delete(&self, key: &ItemKey) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE pk = ? AND sk = ?")
            .bind(&key.pk)
            .bind(&key.sk)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                log_db_error("delete", &e);
                StoreError::from(e)
            })?;

        Ok(result.rows_affected() > 0)
    }
}
