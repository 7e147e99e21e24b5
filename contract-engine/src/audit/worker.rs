//! Audit worker
//!
//! Drains the record channel and appends each entry to storage. Append
//! failures are logged and dropped; the business operation that emitted the
//! entry has already moved on.

use super::storage::AuditStorage;
use super::types::AuditEntry;
use std::sync::Arc;
use tokio::sync::mpsc::Receiver;
use tracing::{debug, error};

pub async fn run(storage: Arc<AuditStorage>, mut rx: Receiver<AuditEntry>) {
    while let Some(entry) = rx.recv().await {
        let contract_id = entry.contract_id.clone();
        let action = entry.action;
        match storage.append(entry).await {
            Ok(stored) => {
                debug!(
                    contract_id = %contract_id,
                    action = %action,
                    sequence = stored.sequence,
                    "Audit entry appended"
                );
            }
            Err(e) => {
                error!(
                    contract_id = %contract_id,
                    action = %action,
                    "Failed to append audit entry: {e}"
                );
            }
        }
    }
    debug!("Audit worker stopped: channel closed");
}
