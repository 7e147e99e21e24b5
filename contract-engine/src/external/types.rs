//! Payloads exchanged with the external registries

use serde::{Deserialize, Serialize};

const STATUS_ACTIVE: &str = "ACTIVE";

/// Client registry record for an owner or cosigner party
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub id: String,
    pub status: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl ClientInfo {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}

/// Meter registry record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeterInfo {
    pub id: String,
    pub status: String,
}

impl MeterInfo {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}

/// Result of provisioning a meter for an address
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedMeter {
    pub id: String,
    pub number: String,
}

/// Subscription registry record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionInfo {
    pub id: String,
    pub status: String,
}

impl SubscriptionInfo {
    pub fn is_active(&self) -> bool {
        self.status.eq_ignore_ascii_case(STATUS_ACTIVE)
    }
}

/// Field intervention dispatch payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterventionRequest {
    /// e.g. "installation", "removal"
    pub intervention_type: String,
    pub contract_id: String,
    pub meter_id: Option<String>,
    /// Unix millis
    pub planned_at: i64,
    /// 1 (urgent) .. 5 (routine)
    pub priority: u8,
}
