//! Party reference — polymorphic owner/cosigner identity
//!
//! A contract owner or cosigner is either an individual user or an
//! organization. The reference is a tagged union resolved through one
//! registry lookup per variant, never two parallel nullable foreign keys.

use serde::{Deserialize, Serialize};

/// Reference to an individual or an organization
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum PartyRef {
    /// An individual user in the client registry
    Individual(String),
    /// An organization in the client registry
    Organization(String),
}

impl PartyRef {
    /// The referenced registry id
    pub fn id(&self) -> &str {
        match self {
            PartyRef::Individual(id) | PartyRef::Organization(id) => id,
        }
    }

    /// Storage discriminant
    pub fn kind(&self) -> &'static str {
        match self {
            PartyRef::Individual(_) => "individual",
            PartyRef::Organization(_) => "organization",
        }
    }

    /// Rebuild from storage columns; `None` on an unknown discriminant
    pub fn from_parts(kind: &str, id: impl Into<String>) -> Option<Self> {
        match kind {
            "individual" => Some(PartyRef::Individual(id.into())),
            "organization" => Some(PartyRef::Organization(id.into())),
            _ => None,
        }
    }
}

impl std::fmt::Display for PartyRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_parts() {
        let p = PartyRef::Organization("org-7".into());
        let back = PartyRef::from_parts(p.kind(), p.id()).unwrap();
        assert_eq!(p, back);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(PartyRef::from_parts("robot", "x").is_none());
    }

    #[test]
    fn test_serde_tagged() {
        let p = PartyRef::Individual("u-1".into());
        let json = serde_json::to_string(&p).unwrap();
        assert_eq!(json, r#"{"type":"individual","id":"u-1"}"#);
    }
}
