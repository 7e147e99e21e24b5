//! Sequence Allocator
//!
//! Thin service over the counter repository. A counter is keyed by
//! `(entity_kind, partition_key, period_key)` and springs into existence on
//! first use. Values are strictly increasing per partition and never reused;
//! a business failure after allocation leaves a gap, which is acceptable.

use crate::db::repository::sequence;
use crate::db::repository::RepoResult;
use sqlx::SqlitePool;

/// Entity kind under which contract numbers are partitioned
pub const ENTITY_CONTRACT: &str = "contract";
/// Entity kind under which meter serials are partitioned
pub const ENTITY_METER: &str = "meter";

/// Allocates monotonically increasing sequence values backed by the
/// `sequence_counter` table. Cheap to clone, shares the pool.
#[derive(Clone)]
pub struct SequenceAllocator {
    pool: SqlitePool,
}

impl SequenceAllocator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Next value for an arbitrary partition
    pub async fn next(
        &self,
        entity_kind: &str,
        partition_key: &str,
        period_key: &str,
    ) -> RepoResult<i64> {
        sequence::next_value(&self.pool, entity_kind, partition_key, period_key).await
    }

    /// Next contract sequence for a zone code within a two-digit year period
    pub async fn next_contract(&self, zone_code: &str, year: i32) -> RepoResult<i64> {
        let period = format!("{:02}", year.rem_euclid(100));
        self.next(ENTITY_CONTRACT, zone_code, &period).await
    }

    /// Last issued value for a partition, if any (diagnostics)
    pub async fn current(
        &self,
        entity_kind: &str,
        partition_key: &str,
        period_key: &str,
    ) -> RepoResult<Option<i64>> {
        sequence::current_value(&self.pool, entity_kind, partition_key, period_key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::DbService;
    use std::collections::HashSet;

    async fn test_allocator() -> (tempfile::TempDir, SequenceAllocator) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("alloc.db");
        let db = DbService::new(path.to_str().unwrap()).await.unwrap();
        (dir, SequenceAllocator::new(db.pool))
    }

    #[tokio::test]
    async fn test_contract_partition_uses_two_digit_year() {
        let (_dir, alloc) = test_allocator().await;
        assert_eq!(alloc.next_contract("TLS", 2025).await.unwrap(), 1);
        assert_eq!(alloc.next_contract("TLS", 2025).await.unwrap(), 2);
        // Same last-two-digits year shares the counter
        assert_eq!(alloc.next_contract("TLS", 2125).await.unwrap(), 3);
        assert_eq!(alloc.next_contract("TLS", 2026).await.unwrap(), 1);
        assert_eq!(
            alloc.current(ENTITY_CONTRACT, "TLS", "25").await.unwrap(),
            Some(3)
        );
    }

    #[tokio::test]
    async fn test_concurrent_allocations_are_distinct() {
        let (_dir, alloc) = test_allocator().await;
        let mut handles = Vec::new();
        for _ in 0..16 {
            let a = alloc.clone();
            handles.push(tokio::spawn(
                async move { a.next_contract("TLS", 2025).await },
            ));
        }
        let mut seen = HashSet::new();
        for h in handles {
            let v = h.await.unwrap().unwrap();
            assert!(seen.insert(v), "value {v} issued twice");
        }
        assert_eq!(seen.len(), 16);
        assert_eq!(*seen.iter().max().unwrap(), 16);
    }
}
