//! Contract Lifecycle Orchestration Engine
//!
//! The core subsystem of the billing/contract platform:
//! - drives contracts through a guarded finite-state lifecycle,
//! - mints collision-free human-readable business identifiers under
//!   concurrent load,
//! - coordinates multi-step creation/finalization workflows across the
//!   external registries with partial-failure compensation,
//! - produces an immutable, queryable audit trail of every transition.
//!
//! Transport wiring (REST routes, message buses) lives outside this crate;
//! a service binary embeds [`Orchestrator`] and mounts its own endpoints.

pub mod audit;
pub mod common;
pub mod core;
pub mod db;
pub mod external;
pub mod lifecycle;
pub mod numbering;
pub mod orchestrator;
pub mod validation;

pub use crate::core::config::Config;
pub use orchestrator::Orchestrator;
