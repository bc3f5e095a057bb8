use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, from_json, ser, to_json};
use crate::repository::{SnapshotRepository, StorageError};

#[async_trait::async_trait]
impl SnapshotRepository for SqliteRepository {
    async fn put(&self, key: &str, value: &Value) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO kv_snapshots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(key)
        .bind(to_json(value)?)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let row = sqlx::query("SELECT value FROM kv_snapshots WHERE key = ?1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("value").map_err(ser)?;
                from_json(&raw).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<bool, StorageError> {
        let res = sqlx::query("DELETE FROM kv_snapshots WHERE key = ?1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<(String, Value)>, StorageError> {
        // substr avoids LIKE wildcard escaping for keys containing `_` or `%`.
        let rows = sqlx::query(
            r"
            SELECT key, value FROM kv_snapshots
            WHERE substr(key, 1, length(?1)) = ?1
            ORDER BY key
            ",
        )
        .bind(prefix)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("key").map_err(ser)?;
            let raw: String = row.try_get("value").map_err(ser)?;
            out.push((key, from_json(&raw)?));
        }
        Ok(out)
    }
}
