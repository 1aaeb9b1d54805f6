// SPDX-License-Identifier: GPL-3.0-or-later
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;
use sqlx::SqlitePool;
use tracing::debug;

use crate::store::{ConfigStore, StoreError};

/// SQLx-backed config blob store. One row per `(instance_id, key)` pair,
/// the JSON document serialized into a TEXT column.
pub struct SqliteConfigStore {
    pool: SqlitePool,
}

impl SqliteConfigStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS config_blobs (
                instance_id TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (instance_id, key)
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|error| StoreError::Backend(error.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl ConfigStore for SqliteConfigStore {
    async fn get(&self, instance_id: &str, key: &str) -> Result<Option<Value>, StoreError> {
        debug!(target: "store", instance_id, key, "fetching config blob");
        let row = sqlx::query(
            "SELECT value FROM config_blobs WHERE instance_id = ? AND key = ? LIMIT 1",
        )
        .bind(instance_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| StoreError::Backend(error.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let raw: String = row
            .try_get("value")
            .map_err(|error| StoreError::Backend(error.to_string()))?;

        let value = serde_json::from_str(&raw).map_err(|error| StoreError::Corrupt {
            key: key.to_string(),
            reason: error.to_string(),
        })?;

        Ok(Some(value))
    }

    async fn save(&self, instance_id: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        debug!(target: "store", instance_id, key, "saving config blob");
        let raw = value.to_string();
        let updated_at = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO config_blobs (instance_id, key, value, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (instance_id, key)
            DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(instance_id)
        .bind(key)
        .bind(raw)
        .bind(updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| StoreError::Backend(error.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::SqliteConfigStore;
    use crate::store::{ConfigStore, StoreError};
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn memory_store() -> SqliteConfigStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        SqliteConfigStore::new(pool).await.expect("schema")
    }

    #[tokio::test]
    async fn round_trips_json_blobs() {
        let store = memory_store().await;
        store
            .save("default", "size_limits", &json!({"1080p WEB": {"min": 5}}))
            .await
            .unwrap();

        let value = store.get("default", "size_limits").await.unwrap();
        assert_eq!(value, Some(json!({"1080p WEB": {"min": 5}})));
    }

    #[tokio::test]
    async fn upsert_replaces_previous_document() {
        let store = memory_store().await;
        store.save("default", "k", &json!({"v": 1})).await.unwrap();
        store.save("default", "k", &json!({"v": 2})).await.unwrap();

        let value = store.get("default", "k").await.unwrap();
        assert_eq!(value, Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn corrupt_rows_surface_as_typed_error() {
        let store = memory_store().await;
        sqlx::query(
            "INSERT INTO config_blobs (instance_id, key, value, updated_at) VALUES (?, ?, ?, ?)",
        )
        .bind("default")
        .bind("bad")
        .bind("{not json")
        .bind("2026-01-01T00:00:00Z")
        .execute(&store.pool)
        .await
        .unwrap();

        let error = store.get("default", "bad").await.unwrap_err();
        assert!(matches!(error, StoreError::Corrupt { .. }));
    }
}
