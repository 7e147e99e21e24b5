//! Audit Recorder
//!
//! Append-only trail of every action taken against a contract:
//! - [`types`]: the entry, action enumeration and query types
//! - [`storage`]: persistence with a sha256 hash chain and verification
//! - [`service`]: the business-facing handle; `record` never fails
//! - [`worker`]: background task draining the record channel
//!
//! Deliberate asymmetry: a failed audit write is logged and swallowed,
//! never propagated to the business operation that triggered it.

pub mod service;
pub mod storage;
pub mod types;
pub mod worker;

pub use service::AuditService;
pub use storage::{AuditStorage, AuditStorageError, ChainStatus, GENESIS_HASH};
pub use types::{AuditAction, AuditEntry, AuditPage, AuditQuery};
