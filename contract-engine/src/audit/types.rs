//! Audit domain types

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What happened to a contract. Stored as the snake_case string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Creation,
    Modification,
    Signature,
    Suspension,
    Reactivation,
    Resiliation,
    Renewal,
    Cancellation,
    Activation,
    Termination,
    MeterLink,
    MeterUnlink,
    SubscriptionLink,
    CosignerAdd,
    CosignerUpdate,
    CosignerSignature,
    Compensation,
}

impl AuditAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Creation => "creation",
            AuditAction::Modification => "modification",
            AuditAction::Signature => "signature",
            AuditAction::Suspension => "suspension",
            AuditAction::Reactivation => "reactivation",
            AuditAction::Resiliation => "resiliation",
            AuditAction::Renewal => "renewal",
            AuditAction::Cancellation => "cancellation",
            AuditAction::Activation => "activation",
            AuditAction::Termination => "termination",
            AuditAction::MeterLink => "meter_link",
            AuditAction::MeterUnlink => "meter_unlink",
            AuditAction::SubscriptionLink => "subscription_link",
            AuditAction::CosignerAdd => "cosigner_add",
            AuditAction::CosignerUpdate => "cosigner_update",
            AuditAction::CosignerSignature => "cosigner_signature",
            AuditAction::Compensation => "compensation",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "creation" => AuditAction::Creation,
            "modification" => AuditAction::Modification,
            "signature" => AuditAction::Signature,
            "suspension" => AuditAction::Suspension,
            "reactivation" => AuditAction::Reactivation,
            "resiliation" => AuditAction::Resiliation,
            "renewal" => AuditAction::Renewal,
            "cancellation" => AuditAction::Cancellation,
            "activation" => AuditAction::Activation,
            "termination" => AuditAction::Termination,
            "meter_link" => AuditAction::MeterLink,
            "meter_unlink" => AuditAction::MeterUnlink,
            "subscription_link" => AuditAction::SubscriptionLink,
            "cosigner_add" => AuditAction::CosignerAdd,
            "cosigner_update" => AuditAction::CosignerUpdate,
            "cosigner_signature" => AuditAction::CosignerSignature,
            "compensation" => AuditAction::Compensation,
            _ => return None,
        })
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only record of one action against one contract. Never updated
/// or deleted after insertion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Chain position, assigned by storage (0 before append)
    #[serde(default)]
    pub sequence: i64,
    pub contract_id: String,
    pub tenant_id: String,
    /// None for system-initiated actions
    pub actor_id: Option<String>,
    pub action: AuditAction,
    pub before_snapshot: Option<Value>,
    pub after_snapshot: Option<Value>,
    /// Unix millis
    pub occurred_at: i64,
    /// Hash of the previous chain entry ("genesis" for the first)
    #[serde(default)]
    pub prev_hash: String,
    /// sha256 over this entry's content plus prev_hash
    #[serde(default)]
    pub curr_hash: String,
}

impl AuditEntry {
    /// System-initiated entry (no actor) occurring now
    pub fn system(
        contract_id: impl Into<String>,
        tenant_id: impl Into<String>,
        action: AuditAction,
        before_snapshot: Option<Value>,
        after_snapshot: Option<Value>,
    ) -> Self {
        Self {
            sequence: 0,
            contract_id: contract_id.into(),
            tenant_id: tenant_id.into(),
            actor_id: None,
            action,
            before_snapshot,
            after_snapshot,
            occurred_at: shared::util::now_millis(),
            prev_hash: String::new(),
            curr_hash: String::new(),
        }
    }

    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }
}

/// Query filter for the audit trail of one contract
#[derive(Debug, Clone, Default)]
pub struct AuditQuery {
    pub action: Option<AuditAction>,
    /// Inclusive lower bound on occurred_at (millis)
    pub date_from: Option<i64>,
    /// Inclusive upper bound on occurred_at (millis)
    pub date_to: Option<i64>,
    /// 1-based page number (0 treated as 1)
    pub page: u32,
    /// Page size (0 treated as 20)
    pub limit: u32,
}

impl AuditQuery {
    pub fn page_size(&self) -> i64 {
        if self.limit == 0 {
            20
        } else {
            self.limit as i64
        }
    }

    pub fn offset(&self) -> i64 {
        let page = self.page.max(1) as i64;
        (page - 1) * self.page_size()
    }
}

/// One newest-first page plus the filtered total
#[derive(Debug, Clone, Serialize)]
pub struct AuditPage {
    pub entries: Vec<AuditEntry>,
    pub total: i64,
}
