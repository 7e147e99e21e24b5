//! Cosigner model
//!
//! A cosigner is a secondary party bound to exactly one contract who must
//! independently sign before the contract can be finalized (when the
//! contract kind requires it). The sum of `share_percentage` across a
//! contract's cosigners never exceeds 100.

use super::party::PartyRef;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Cosigner role on the contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CosignerRole {
    #[serde(rename = "PRINCIPAL")]
    Principal,
    #[serde(rename = "SECONDARY")]
    Secondary,
}

impl CosignerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Principal => "PRINCIPAL",
            Self::Secondary => "SECONDARY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PRINCIPAL" => Some(Self::Principal),
            "SECONDARY" => Some(Self::Secondary),
            _ => None,
        }
    }
}

/// Invitation lifecycle for a cosigner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvitationState {
    #[serde(rename = "SENT")]
    Sent,
    #[serde(rename = "ACCEPTED")]
    Accepted,
    #[serde(rename = "REFUSED")]
    Refused,
}

impl InvitationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Accepted => "ACCEPTED",
            Self::Refused => "REFUSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SENT" => Some(Self::Sent),
            "ACCEPTED" => Some(Self::Accepted),
            "REFUSED" => Some(Self::Refused),
            _ => None,
        }
    }
}

/// Cosigner record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cosigner {
    pub id: String,
    /// Owning contract
    pub contract_id: String,
    /// Individual or organization in the client registry
    pub party: PartyRef,
    pub role: CosignerRole,
    /// 0-100; the per-contract sum is capped at 100
    pub share_percentage: f64,
    pub invitation_state: InvitationState,
    /// Signature flag; once true the record is immutable except for
    /// administrative correction
    pub signed: bool,
    /// Signature timestamp (Unix millis), set together with `signed`
    pub signed_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Cosigner {
    /// Snapshot of the auditable fields, used for before/after diffs
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "party": self.party.to_string(),
            "role": self.role.as_str(),
            "share_percentage": self.share_percentage,
            "invitation_state": self.invitation_state.as_str(),
            "signed": self.signed,
            "signed_at": self.signed_at,
        })
    }
}

/// Create cosigner payload
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CosignerCreate {
    pub party: PartyRef,
    pub role: CosignerRole,
    #[validate(range(min = 0.0, max = 100.0))]
    pub share_percentage: f64,
}

/// Update cosigner payload
///
/// `admin_override` unlocks signed records for administrative correction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CosignerUpdate {
    pub role: Option<CosignerRole>,
    pub share_percentage: Option<f64>,
    pub invitation_state: Option<InvitationState>,
    #[serde(default)]
    pub admin_override: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(CosignerRole::parse("PRINCIPAL"), Some(CosignerRole::Principal));
        assert_eq!(CosignerRole::parse("SECONDARY"), Some(CosignerRole::Secondary));
        assert_eq!(CosignerRole::parse("third"), None);
    }

    #[test]
    fn test_invitation_round_trip() {
        for s in [
            InvitationState::Sent,
            InvitationState::Accepted,
            InvitationState::Refused,
        ] {
            assert_eq!(InvitationState::parse(s.as_str()), Some(s));
        }
    }
}
