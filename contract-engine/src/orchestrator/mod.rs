//! Orchestrator (saga coordinator)
//!
//! Executes each compound business operation as an ordered step sequence,
//! each step either a local persistence mutation or one external call:
//! - [`create`]: contract creation with optional meter provisioning
//! - [`finalize`]: activation with number minting and compensation
//! - [`lifecycle_ops`]: the guarded single-transition operations
//! - [`links`]: meter and subscription reference management
//! - [`cosigners`]: cosigner add / update / signature recording
//! - [`saga`]: the step recorder running compensations in reverse order
//!
//! All cross-request coordination happens through the persistence layer;
//! the orchestrator holds no mutable in-memory state. Per-contract
//! serialization relies on the `version` column: a losing writer gets a
//! conflict and must re-read, never blindly overwrite.

pub mod cosigners;
pub mod create;
pub mod finalize;
pub mod lifecycle_ops;
pub mod links;
pub mod saga;

pub use saga::{Saga, SagaStep, StepStatus};

use crate::audit::{AuditAction, AuditEntry, AuditPage, AuditQuery, AuditService};
use crate::db::repository::{contract as contract_repo, cosigner as cosigner_repo};
use crate::external::{
    ClientRegistry, InterventionScheduler, MeterRegistry, NotificationDispatcher,
    SubscriptionRegistry,
};
use crate::numbering::SequenceAllocator;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use shared::error::{AppError, AppResult};
use shared::models::{Contract, Cosigner};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::warn;

pub struct Orchestrator {
    pool: SqlitePool,
    allocator: SequenceAllocator,
    audit: AuditService,
    max_target_years: i32,
    clients: Arc<dyn ClientRegistry>,
    meters: Arc<dyn MeterRegistry>,
    subscriptions: Arc<dyn SubscriptionRegistry>,
    interventions: Arc<dyn InterventionScheduler>,
    notifications: Arc<dyn NotificationDispatcher>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: SqlitePool,
        audit: AuditService,
        clients: Arc<dyn ClientRegistry>,
        meters: Arc<dyn MeterRegistry>,
        subscriptions: Arc<dyn SubscriptionRegistry>,
        interventions: Arc<dyn InterventionScheduler>,
        notifications: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        Self {
            allocator: SequenceAllocator::new(pool.clone()),
            pool,
            audit,
            max_target_years: crate::lifecycle::MAX_TARGET_YEARS,
            clients,
            meters,
            subscriptions,
            interventions,
            notifications,
        }
    }

    /// Override the renewal horizon (years a transition target date may lie
    /// in the future)
    pub fn with_max_target_years(mut self, years: i32) -> Self {
        self.max_target_years = years;
        self
    }

    /// Production wiring: HTTP clients against the configured registry
    /// base URLs, one shared reqwest client with the bounded timeout
    pub fn with_http_clients(
        pool: SqlitePool,
        config: &crate::core::config::Config,
    ) -> anyhow::Result<Self> {
        use crate::external::http;

        let client = http::build_client(config.external_timeout_ms)?;
        let audit = AuditService::new(pool.clone(), config.audit_buffer_size);
        let orchestrator = Self::new(
            pool,
            audit,
            Arc::new(http::HttpClientRegistry::new(
                client.clone(),
                config.client_registry_url.clone(),
            )),
            Arc::new(http::HttpMeterRegistry::new(
                client.clone(),
                config.meter_registry_url.clone(),
            )),
            Arc::new(http::HttpSubscriptionRegistry::new(
                client.clone(),
                config.subscription_registry_url.clone(),
            )),
            Arc::new(http::HttpInterventionScheduler::new(
                client.clone(),
                config.intervention_url.clone(),
            )),
            Arc::new(http::HttpNotificationDispatcher::new(
                client,
                config.notification_url.clone(),
            )),
        );
        Ok(orchestrator.with_max_target_years(config.max_target_years))
    }

    // ==================== Shared helpers ====================

    pub(crate) fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    pub(crate) async fn load_contract(&self, id: &str) -> AppResult<Contract> {
        contract_repo::find_by_id(&self.pool, id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::contract_not_found(id))
    }

    pub(crate) async fn load_cosigners(&self, contract_id: &str) -> AppResult<Vec<Cosigner>> {
        cosigner_repo::find_by_contract(&self.pool, contract_id)
            .await
            .map_err(AppError::from)
    }

    /// Active linked meters, per the external registry. Pre-mutation check,
    /// so an external failure simply rejects the operation.
    pub(crate) async fn active_meter_count(&self, contract: &Contract) -> AppResult<usize> {
        let Some(meter_id) = contract.meter_ref.as_deref() else {
            return Ok(0);
        };
        let meter = self.meters.get_meter(meter_id).await.map_err(AppError::from)?;
        Ok(usize::from(meter.is_active()))
    }

    /// Enqueue an audit entry; infallible by policy
    pub(crate) fn record_audit(
        &self,
        contract: &Contract,
        action: AuditAction,
        actor: Option<&str>,
        before: Option<Value>,
        after: Option<Value>,
    ) {
        let mut entry = AuditEntry::system(
            contract.id.as_str(),
            contract.tenant_id.as_str(),
            action,
            before,
            after,
        );
        if let Some(actor) = actor {
            entry = entry.with_actor(actor);
        }
        self.audit.record(entry);
    }

    /// Fire-and-forget event; failures are logged, never surfaced
    pub(crate) async fn emit_best_effort(&self, topic: &str, payload: &Value) {
        if let Err(e) = self.notifications.emit_event(topic, payload).await {
            warn!(topic, "Notification dropped: {e}");
        }
    }

    /// Fire-and-forget email
    pub(crate) async fn email_best_effort(&self, to: &str, subject: &str, body: &str) {
        if let Err(e) = self.notifications.send_email(to, subject, body).await {
            warn!(to, "Email dropped: {e}");
        }
    }

    // ==================== Read side ====================

    pub async fn get_contract(&self, id: &str) -> AppResult<Contract> {
        self.load_contract(id).await
    }

    pub async fn get_cosigners(&self, contract_id: &str) -> AppResult<Vec<Cosigner>> {
        // Surface a clean not-found instead of an empty list
        self.load_contract(contract_id).await?;
        self.load_cosigners(contract_id).await
    }

    /// Walk the audit hash chain and report the first break, if any
    pub async fn verify_audit_chain(&self) -> AppResult<crate::audit::ChainStatus> {
        self.audit
            .verify_chain()
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    /// One page of the contract's audit trail, newest first
    pub async fn audit_trail(
        &self,
        contract_id: &str,
        filter: &AuditQuery,
    ) -> AppResult<AuditPage> {
        self.audit
            .query(contract_id, filter)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }
}
