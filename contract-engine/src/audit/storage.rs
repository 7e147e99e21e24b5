//! Audit storage
//!
//! Append-only persistence for [`AuditEntry`] with a sha256 hash chain:
//! every row carries the hash of its predecessor (`prev_hash`, `"genesis"`
//! for the first row) and a hash over its own content. `verify_chain` walks
//! the rows in order and reports the first break.
//!
//! Appends serialize through an async mutex so the chain head is read and
//! extended atomically. Queries run lock-free.

use super::types::{AuditAction, AuditEntry, AuditPage, AuditQuery};
use serde_json::Value;
use sha2::{Digest, Sha256};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use thiserror::Error;
use tokio::sync::Mutex;

/// First link of every chain
pub const GENESIS_HASH: &str = "genesis";

#[derive(Debug, Error)]
pub enum AuditStorageError {
    #[error("Audit database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Audit snapshot serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Where the chain verification failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainStatus {
    Valid { length: i64 },
    /// Entry whose stored hash does not match its recomputed content hash
    TamperedEntry { sequence: i64 },
    /// Entry whose prev_hash does not equal the predecessor's curr_hash
    BrokenLink { sequence: i64 },
}

pub struct AuditStorage {
    pool: SqlitePool,
    append_lock: Mutex<()>,
}

fn content_hash(entry: &AuditEntry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry.sequence.to_le_bytes());
    hasher.update(entry.contract_id.as_bytes());
    hasher.update(entry.tenant_id.as_bytes());
    hasher.update(entry.actor_id.as_deref().unwrap_or("").as_bytes());
    hasher.update(entry.action.as_str().as_bytes());
    if let Some(s) = &entry.before_snapshot {
        hasher.update(s.to_string().as_bytes());
    }
    if let Some(s) = &entry.after_snapshot {
        hasher.update(s.to_string().as_bytes());
    }
    hasher.update(entry.occurred_at.to_le_bytes());
    hasher.update(entry.prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

fn map_row(row: &SqliteRow) -> Result<AuditEntry, AuditStorageError> {
    let action: String = row.try_get("action")?;
    let before: Option<String> = row.try_get("before_snapshot")?;
    let after: Option<String> = row.try_get("after_snapshot")?;

    Ok(AuditEntry {
        sequence: row.try_get("sequence")?,
        contract_id: row.try_get("contract_id")?,
        tenant_id: row.try_get("tenant_id")?,
        actor_id: row.try_get("actor_id")?,
        action: AuditAction::parse(&action).unwrap_or(AuditAction::Modification),
        before_snapshot: before
            .map(|s| serde_json::from_str::<Value>(&s))
            .transpose()?,
        after_snapshot: after
            .map(|s| serde_json::from_str::<Value>(&s))
            .transpose()?,
        occurred_at: row.try_get("occurred_at")?,
        prev_hash: row.try_get("prev_hash")?,
        curr_hash: row.try_get("curr_hash")?,
    })
}

impl AuditStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            append_lock: Mutex::new(()),
        }
    }

    /// Append one entry at the chain head, assigning its sequence and hashes
    pub async fn append(&self, mut entry: AuditEntry) -> Result<AuditEntry, AuditStorageError> {
        let _guard = self.append_lock.lock().await;

        let head: Option<(i64, String)> = sqlx::query_as(
            "SELECT sequence, curr_hash FROM audit_entry ORDER BY sequence DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        let (last_seq, prev_hash) = match head {
            Some((seq, hash)) => (seq, hash),
            None => (0, GENESIS_HASH.to_string()),
        };
        entry.sequence = last_seq + 1;
        entry.prev_hash = prev_hash;
        entry.curr_hash = content_hash(&entry);

        sqlx::query(
            "INSERT INTO audit_entry (sequence, contract_id, tenant_id, actor_id, action, \
             before_snapshot, after_snapshot, occurred_at, prev_hash, curr_hash) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.sequence)
        .bind(&entry.contract_id)
        .bind(&entry.tenant_id)
        .bind(&entry.actor_id)
        .bind(entry.action.as_str())
        .bind(entry.before_snapshot.as_ref().map(|v| v.to_string()))
        .bind(entry.after_snapshot.as_ref().map(|v| v.to_string()))
        .bind(entry.occurred_at)
        .bind(&entry.prev_hash)
        .bind(&entry.curr_hash)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// One newest-first page of a contract's trail plus the filtered total
    pub async fn query(
        &self,
        contract_id: &str,
        filter: &AuditQuery,
    ) -> Result<AuditPage, AuditStorageError> {
        let mut conditions = String::from("contract_id = ?");
        if filter.action.is_some() {
            conditions.push_str(" AND action = ?");
        }
        if filter.date_from.is_some() {
            conditions.push_str(" AND occurred_at >= ?");
        }
        if filter.date_to.is_some() {
            conditions.push_str(" AND occurred_at <= ?");
        }

        let count_sql = format!("SELECT COUNT(*) FROM audit_entry WHERE {conditions}");
        let mut count_q = sqlx::query_scalar(&count_sql).bind(contract_id);
        if let Some(action) = filter.action {
            count_q = count_q.bind(action.as_str());
        }
        if let Some(from) = filter.date_from {
            count_q = count_q.bind(from);
        }
        if let Some(to) = filter.date_to {
            count_q = count_q.bind(to);
        }
        let total: i64 = count_q.fetch_one(&self.pool).await?;

        // sequence is the stable tiebreaker for same-millisecond entries
        let page_sql = format!(
            "SELECT sequence, contract_id, tenant_id, actor_id, action, before_snapshot, \
             after_snapshot, occurred_at, prev_hash, curr_hash \
             FROM audit_entry WHERE {conditions} \
             ORDER BY occurred_at DESC, sequence DESC LIMIT ? OFFSET ?"
        );
        let mut page_q = sqlx::query(&page_sql).bind(contract_id);
        if let Some(action) = filter.action {
            page_q = page_q.bind(action.as_str());
        }
        if let Some(from) = filter.date_from {
            page_q = page_q.bind(from);
        }
        if let Some(to) = filter.date_to {
            page_q = page_q.bind(to);
        }
        let rows = page_q
            .bind(filter.page_size())
            .bind(filter.offset())
            .fetch_all(&self.pool)
            .await?;

        let entries = rows.iter().map(map_row).collect::<Result<Vec<_>, _>>()?;
        Ok(AuditPage { entries, total })
    }

    /// Walk the whole chain in order, recomputing hashes
    pub async fn verify_chain(&self) -> Result<ChainStatus, AuditStorageError> {
        let rows = sqlx::query(
            "SELECT sequence, contract_id, tenant_id, actor_id, action, before_snapshot, \
             after_snapshot, occurred_at, prev_hash, curr_hash \
             FROM audit_entry ORDER BY sequence ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut expected_prev = GENESIS_HASH.to_string();
        let mut length = 0;
        for row in &rows {
            let entry = map_row(row)?;
            if entry.prev_hash != expected_prev {
                return Ok(ChainStatus::BrokenLink {
                    sequence: entry.sequence,
                });
            }
            if content_hash(&entry) != entry.curr_hash {
                return Ok(ChainStatus::TamperedEntry {
                    sequence: entry.sequence,
                });
            }
            expected_prev = entry.curr_hash.clone();
            length += 1;
        }
        Ok(ChainStatus::Valid { length })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use serde_json::json;

    async fn test_storage() -> (tempfile::TempDir, AuditStorage) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.db");
        let db = DbService::new(path.to_str().unwrap()).await.unwrap();
        (dir, AuditStorage::new(db.pool))
    }

    fn entry(contract_id: &str, action: AuditAction) -> AuditEntry {
        AuditEntry::system(contract_id, "t-1", action, None, Some(json!({"ok": true})))
    }

    #[tokio::test]
    async fn test_append_builds_hash_chain() {
        let (_dir, storage) = test_storage().await;
        let a = storage.append(entry("c-1", AuditAction::Creation)).await.unwrap();
        let b = storage.append(entry("c-1", AuditAction::Activation)).await.unwrap();

        assert_eq!(a.sequence, 1);
        assert_eq!(a.prev_hash, GENESIS_HASH);
        assert_eq!(b.sequence, 2);
        assert_eq!(b.prev_hash, a.curr_hash);
        assert_eq!(
            storage.verify_chain().await.unwrap(),
            ChainStatus::Valid { length: 2 }
        );
    }

    #[tokio::test]
    async fn test_query_newest_first_with_filters() {
        let (_dir, storage) = test_storage().await;
        storage.append(entry("c-1", AuditAction::Creation)).await.unwrap();
        storage.append(entry("c-1", AuditAction::MeterLink)).await.unwrap();
        storage.append(entry("c-1", AuditAction::Activation)).await.unwrap();
        storage.append(entry("c-2", AuditAction::Creation)).await.unwrap();

        let page = storage
            .query("c-1", &AuditQuery::default())
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert_eq!(page.entries.len(), 3);
        // Newest first, sequence breaks same-millisecond ties
        assert_eq!(page.entries[0].action, AuditAction::Activation);
        assert_eq!(page.entries[2].action, AuditAction::Creation);

        let page = storage
            .query(
                "c-1",
                &AuditQuery {
                    action: Some(AuditAction::MeterLink),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.entries[0].action, AuditAction::MeterLink);
    }

    #[tokio::test]
    async fn test_query_paging_is_stable() {
        let (_dir, storage) = test_storage().await;
        for _ in 0..5 {
            storage.append(entry("c-1", AuditAction::Modification)).await.unwrap();
        }
        let q1 = AuditQuery { page: 1, limit: 2, ..Default::default() };
        let q2 = AuditQuery { page: 2, limit: 2, ..Default::default() };
        let p1 = storage.query("c-1", &q1).await.unwrap();
        let p2 = storage.query("c-1", &q2).await.unwrap();
        assert_eq!(p1.total, 5);
        assert_eq!(p1.entries.len(), 2);
        assert_eq!(p2.entries.len(), 2);
        let s1: Vec<i64> = p1.entries.iter().map(|e| e.sequence).collect();
        let s2: Vec<i64> = p2.entries.iter().map(|e| e.sequence).collect();
        assert_eq!(s1, vec![5, 4]);
        assert_eq!(s2, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_verify_chain_detects_tampering() {
        let (_dir, storage) = test_storage().await;
        storage.append(entry("c-1", AuditAction::Creation)).await.unwrap();
        storage.append(entry("c-1", AuditAction::Activation)).await.unwrap();
        storage.append(entry("c-1", AuditAction::Suspension)).await.unwrap();

        // Rewrite row 2's content behind the chain's back
        sqlx::query("UPDATE audit_entry SET tenant_id = 'evil' WHERE sequence = 2")
            .execute(&storage.pool)
            .await
            .unwrap();

        assert_eq!(
            storage.verify_chain().await.unwrap(),
            ChainStatus::TamperedEntry { sequence: 2 }
        );
    }

    #[tokio::test]
    async fn test_verify_chain_detects_broken_link() {
        let (_dir, storage) = test_storage().await;
        storage.append(entry("c-1", AuditAction::Creation)).await.unwrap();
        storage.append(entry("c-1", AuditAction::Activation)).await.unwrap();

        sqlx::query("DELETE FROM audit_entry WHERE sequence = 1")
            .execute(&storage.pool)
            .await
            .unwrap();

        assert_eq!(
            storage.verify_chain().await.unwrap(),
            ChainStatus::BrokenLink { sequence: 2 }
        );
    }
}
