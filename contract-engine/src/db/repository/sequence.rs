//! Sequence counter repository
//!
//! The single point in the engine requiring strict mutual exclusion. The
//! find-or-create plus increment runs as ONE statement, so SQLite's row
//! locking serializes concurrent callers on the same partition while
//! different partitions proceed independently. A value, once returned, is
//! never reused: failed business operations leave gaps, never duplicates.

use super::RepoResult;
use sqlx::SqlitePool;

/// Atomically increment (creating at 0 if absent) and return the new value
/// for the `(entity_kind, partition_key, period_key)` counter.
pub async fn next_value(
    pool: &SqlitePool,
    entity_kind: &str,
    partition_key: &str,
    period_key: &str,
) -> RepoResult<i64> {
    let value: i64 = sqlx::query_scalar(
        "INSERT INTO sequence_counter (entity_kind, partition_key, period_key, last_value) \
         VALUES (?, ?, ?, 1) \
         ON CONFLICT (entity_kind, partition_key, period_key) \
         DO UPDATE SET last_value = last_value + 1 \
         RETURNING last_value",
    )
    .bind(entity_kind)
    .bind(partition_key)
    .bind(period_key)
    .fetch_one(pool)
    .await?;
    Ok(value)
}

/// Read the last issued value without incrementing (diagnostics only)
pub async fn current_value(
    pool: &SqlitePool,
    entity_kind: &str,
    partition_key: &str,
    period_key: &str,
) -> RepoResult<Option<i64>> {
    let value = sqlx::query_scalar(
        "SELECT last_value FROM sequence_counter \
         WHERE entity_kind = ? AND partition_key = ? AND period_key = ?",
    )
    .bind(entity_kind)
    .bind(partition_key)
    .bind(period_key)
    .fetch_optional(pool)
    .await?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;

    async fn test_pool() -> (tempfile::TempDir, SqlitePool) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seq.db");
        let db = DbService::new(path.to_str().unwrap()).await.unwrap();
        (dir, db.pool)
    }

    #[tokio::test]
    async fn test_lazy_create_and_increment() {
        let (_dir, pool) = test_pool().await;
        assert_eq!(current_value(&pool, "contract", "TLS", "25").await.unwrap(), None);
        assert_eq!(next_value(&pool, "contract", "TLS", "25").await.unwrap(), 1);
        assert_eq!(next_value(&pool, "contract", "TLS", "25").await.unwrap(), 2);
        assert_eq!(
            current_value(&pool, "contract", "TLS", "25").await.unwrap(),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_partitions_are_independent() {
        let (_dir, pool) = test_pool().await;
        assert_eq!(next_value(&pool, "contract", "TLS", "25").await.unwrap(), 1);
        assert_eq!(next_value(&pool, "contract", "LYN", "25").await.unwrap(), 1);
        assert_eq!(next_value(&pool, "contract", "TLS", "26").await.unwrap(), 1);
        assert_eq!(next_value(&pool, "meter", "TLS", "25").await.unwrap(), 1);
        assert_eq!(next_value(&pool, "contract", "TLS", "25").await.unwrap(), 2);
    }
}
