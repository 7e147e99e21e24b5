//! Audit service
//!
//! The handle business code talks to. `record` pushes the entry onto a
//! bounded channel consumed by the background worker; it never returns an
//! error. A full or closed channel is logged and the entry dropped, the
//! caller is unaffected. Queries and chain verification go straight to
//! storage.

use super::storage::{AuditStorage, AuditStorageError, ChainStatus};
use super::types::{AuditEntry, AuditPage, AuditQuery};
use super::worker;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::mpsc::{self, Sender};
use tracing::warn;

#[derive(Clone)]
pub struct AuditService {
    tx: Sender<AuditEntry>,
    storage: Arc<AuditStorage>,
}

impl AuditService {
    /// Create the service and spawn its worker
    pub fn new(pool: SqlitePool, buffer_size: usize) -> Self {
        let storage = Arc::new(AuditStorage::new(pool));
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        tokio::spawn(worker::run(storage.clone(), rx));
        Self { tx, storage }
    }

    /// Enqueue an entry. Infallible by policy: audit is observability, not
    /// a transactional participant.
    pub fn record(&self, entry: AuditEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            warn!("Audit entry dropped: {e}");
        }
    }

    pub async fn query(
        &self,
        contract_id: &str,
        filter: &AuditQuery,
    ) -> Result<AuditPage, AuditStorageError> {
        self.storage.query(contract_id, filter).await
    }

    pub async fn verify_chain(&self) -> Result<ChainStatus, AuditStorageError> {
        self.storage.verify_chain().await
    }
}
