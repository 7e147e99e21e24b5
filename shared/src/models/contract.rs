//! Contract model and lifecycle enumerations

use super::cosigner::CosignerCreate;
use super::party::PartyRef;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Contract lifecycle state
///
/// `Terminated`, `Cancelled` and `Resiliated` are terminal: a contract is
/// never deleted, only transitioned into one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractState {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "ACTIVE")]
    Active,
    #[serde(rename = "SUSPENDED")]
    Suspended,
    #[serde(rename = "TERMINATED")]
    Terminated,
    #[serde(rename = "CANCELLED")]
    Cancelled,
    #[serde(rename = "RESILIATED")]
    Resiliated,
}

impl ContractState {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Active => "ACTIVE",
            Self::Suspended => "SUSPENDED",
            Self::Terminated => "TERMINATED",
            Self::Cancelled => "CANCELLED",
            Self::Resiliated => "RESILIATED",
        }
    }

    /// Rebuild from storage; `None` on an unknown value
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "ACTIVE" => Some(Self::Active),
            "SUSPENDED" => Some(Self::Suspended),
            "TERMINATED" => Some(Self::Terminated),
            "CANCELLED" => Some(Self::Cancelled),
            "RESILIATED" => Some(Self::Resiliated),
            _ => None,
        }
    }

    /// Terminal states admit no further transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminated | Self::Cancelled | Self::Resiliated)
    }
}

impl std::fmt::Display for ContractState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signature axis, independent of the lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureState {
    #[serde(rename = "PENDING")]
    Pending,
    #[serde(rename = "SIGNED")]
    Signed,
    #[serde(rename = "REFUSED")]
    Refused,
}

impl SignatureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Signed => "SIGNED",
            Self::Refused => "REFUSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "SIGNED" => Some(Self::Signed),
            "REFUSED" => Some(Self::Refused),
            _ => None,
        }
    }
}

/// Contract category
///
/// The single-letter code is embedded in the business number
/// (`C-<K>-<ZONE>-<YY>-<SEQ5>`) and is a bit-exact external contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractKind {
    /// Private individual supply (code `I`)
    Individual,
    /// Professional / business supply (code `P`)
    Professional,
    /// Collectivity supply — shared housing, syndicates (code `C`)
    Collectivity,
    /// Public administration supply (code `A`)
    Administration,
}

impl ContractKind {
    /// Business-number code letter
    pub fn code(&self) -> char {
        match self {
            Self::Individual => 'I',
            Self::Professional => 'P',
            Self::Collectivity => 'C',
            Self::Administration => 'A',
        }
    }

    /// Rebuild from the code letter
    pub fn from_code(c: char) -> Option<Self> {
        match c {
            'I' => Some(Self::Individual),
            'P' => Some(Self::Professional),
            'C' => Some(Self::Collectivity),
            'A' => Some(Self::Administration),
            _ => None,
        }
    }

    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Professional => "professional",
            Self::Collectivity => "collectivity",
            Self::Administration => "administration",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "individual" => Some(Self::Individual),
            "professional" => Some(Self::Professional),
            "collectivity" => Some(Self::Collectivity),
            "administration" => Some(Self::Administration),
            _ => None,
        }
    }

    /// Per-kind ceiling for `total_amount`
    pub fn amount_ceiling(&self) -> Decimal {
        match self {
            Self::Individual => Decimal::new(100_000, 0),
            Self::Professional => Decimal::new(1_000_000, 0),
            Self::Collectivity => Decimal::new(5_000_000, 0),
            Self::Administration => Decimal::new(10_000_000, 0),
        }
    }

    /// Administration contracts are single-party by regulation
    pub fn allows_cosigners(&self) -> bool {
        !matches!(self, Self::Administration)
    }

    /// Collectivity contracts must name at least one cosigner
    pub fn requires_cosigner(&self) -> bool {
        matches!(self, Self::Collectivity)
    }
}

impl std::fmt::Display for ContractKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contract record
///
/// Owned exclusively by the orchestrator; every mutation goes through a
/// state-machine-guarded operation and bumps `version` (optimistic lock).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    /// Opaque unique key
    pub id: String,
    /// Isolation boundary; never crosses tenants
    pub tenant_id: String,
    /// Polymorphic owner
    pub owner: PartyRef,
    /// Human-readable business identifier; null until finalized
    pub business_number: Option<String>,
    /// Distribution zone short code (2-10 alphanumeric/`-`/`_`)
    pub zone: String,
    /// Contract category
    pub kind: ContractKind,
    /// Lifecycle state
    pub state: ContractState,
    /// Signature axis
    pub signature_state: SignatureState,
    /// Supply start date
    pub start_date: NaiveDate,
    /// Supply end date, null for open-ended contracts
    pub end_date: Option<NaiveDate>,
    /// Contracted amount; bounded by the kind-specific ceiling
    pub total_amount: Option<f64>,
    /// Linked meter id, if any
    pub meter_ref: Option<String>,
    /// Linked subscription id, if any
    pub subscription_ref: Option<String>,
    /// Optimistic-lock version, bumped on every mutation
    pub version: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contract {
    /// Snapshot of the auditable fields, used for before/after diffs
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "state": self.state.as_str(),
            "signature_state": self.signature_state.as_str(),
            "business_number": self.business_number,
            "zone": self.zone,
            "kind": self.kind.as_str(),
            "start_date": self.start_date.to_string(),
            "end_date": self.end_date.map(|d| d.to_string()),
            "total_amount": self.total_amount,
            "meter_ref": self.meter_ref,
            "subscription_ref": self.subscription_ref,
        })
    }
}

/// Create contract payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ContractCreate {
    #[validate(length(min = 1))]
    pub tenant_id: String,
    pub owner: PartyRef,
    /// 2-10 chars, alphanumeric plus `-` and `_`
    #[validate(length(min = 2, max = 10), custom(function = validate_zone_chars))]
    pub zone: String,
    pub kind: ContractKind,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(range(min = 0.0))]
    pub total_amount: Option<f64>,
    /// Pre-resolved meter id; takes precedence over `service_address`
    pub meter_id: Option<String>,
    /// Supply address; triggers meter provisioning when no meter id is given
    pub service_address: Option<String>,
    pub subscription_id: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub cosigners: Vec<CosignerCreate>,
}

/// Zone charset rule shared by validation and the identifier formatter
fn validate_zone_chars(zone: &str) -> Result<(), ValidationError> {
    if zone
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("zone_charset"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_round_trip() {
        for s in [
            ContractState::Pending,
            ContractState::Active,
            ContractState::Suspended,
            ContractState::Terminated,
            ContractState::Cancelled,
            ContractState::Resiliated,
        ] {
            assert_eq!(ContractState::parse(s.as_str()), Some(s));
        }
        assert_eq!(ContractState::parse("OPEN"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(!ContractState::Pending.is_terminal());
        assert!(!ContractState::Active.is_terminal());
        assert!(!ContractState::Suspended.is_terminal());
        assert!(ContractState::Terminated.is_terminal());
        assert!(ContractState::Cancelled.is_terminal());
        assert!(ContractState::Resiliated.is_terminal());
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(ContractKind::Individual.code(), 'I');
        assert_eq!(ContractKind::Professional.code(), 'P');
        assert_eq!(ContractKind::Collectivity.code(), 'C');
        assert_eq!(ContractKind::Administration.code(), 'A');
        assert_eq!(ContractKind::from_code('P'), Some(ContractKind::Professional));
        assert_eq!(ContractKind::from_code('X'), None);
    }

    #[test]
    fn test_cosigner_cardinality_rules() {
        assert!(!ContractKind::Administration.allows_cosigners());
        assert!(ContractKind::Collectivity.requires_cosigner());
        assert!(ContractKind::Individual.allows_cosigners());
        assert!(!ContractKind::Individual.requires_cosigner());
    }

    #[test]
    fn test_ceilings_ordered_by_kind() {
        assert!(
            ContractKind::Individual.amount_ceiling()
                < ContractKind::Administration.amount_ceiling()
        );
    }

    #[test]
    fn test_create_payload_zone_validation() {
        let req = ContractCreate {
            tenant_id: "t-1".into(),
            owner: PartyRef::Individual("u-1".into()),
            zone: "TLS".into(),
            kind: ContractKind::Professional,
            start_date: NaiveDate::from_ymd_opt(2030, 1, 1).unwrap(),
            end_date: None,
            total_amount: None,
            meter_id: None,
            service_address: None,
            subscription_id: None,
            cosigners: vec![],
        };
        assert!(req.validate().is_ok());

        let mut bad = req.clone();
        bad.zone = "T".into();
        assert!(bad.validate().is_err());

        let mut bad = req.clone();
        bad.zone = "TL S!".into();
        assert!(bad.validate().is_err());

        let mut bad = req;
        bad.total_amount = Some(-5.0);
        assert!(bad.validate().is_err());
    }
}
