//! External subsystem contracts
//!
//! Injected into the orchestrator as `Arc<dyn Trait>`; production wires the
//! [`crate::external::http`] implementations, tests wire
//! [`crate::external::fakes`].

use super::types::{
    ClientInfo, InterventionRequest, MeterInfo, ProvisionedMeter, SubscriptionInfo,
};
use super::ExternalResult;
use async_trait::async_trait;
use serde_json::Value;

/// Party lookup; used to validate an owner or cosigner is active before
/// binding them to a contract
#[async_trait]
pub trait ClientRegistry: Send + Sync {
    async fn get_client(&self, id: &str, tenant_id: &str) -> ExternalResult<ClientInfo>;
}

#[async_trait]
pub trait MeterRegistry: Send + Sync {
    async fn get_meter(&self, id: &str) -> ExternalResult<MeterInfo>;
    async fn check_availability(&self, id: &str) -> ExternalResult<bool>;
    async fn provision_meter(
        &self,
        address: &str,
        zone: &str,
        tenant_id: &str,
        serial: Option<&str>,
    ) -> ExternalResult<ProvisionedMeter>;
    async fn release_meter(&self, id: &str) -> ExternalResult<()>;
}

#[async_trait]
pub trait SubscriptionRegistry: Send + Sync {
    async fn get_subscription(&self, id: &str) -> ExternalResult<SubscriptionInfo>;
}

/// Fire-and-forget; the orchestrator logs failures and never compensates
#[async_trait]
pub trait InterventionScheduler: Send + Sync {
    async fn schedule(&self, request: &InterventionRequest) -> ExternalResult<()>;
}

/// Fire-and-forget, except that `emit_event` failures during finalize are
/// treated as saga failures by the orchestrator
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> ExternalResult<()>;
    async fn send_sms(&self, to: &str, body: &str) -> ExternalResult<()>;
    async fn emit_event(&self, topic: &str, payload: &Value) -> ExternalResult<()>;
}
