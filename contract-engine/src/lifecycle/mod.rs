//! Lifecycle State Machine
//!
//! The transition table is the single source of truth for which contract
//! state changes exist. Each entry names the triggering action, the target
//! state, its preconditions and its post-transition effects. Triples absent
//! from the table are rejected, never inferred.
//!
//! Validation is eager: every violated precondition is collected and
//! returned together so the caller gets complete feedback in one pass.

use crate::audit::AuditAction;
use chrono::{Datelike, NaiveDate};
use shared::models::{ContractState, Cosigner};
use thiserror::Error;

/// Default years a renewal target date may lie in the future; the
/// effective horizon comes from [`TransitionContext::max_target_years`]
pub const MAX_TARGET_YEARS: i32 = 5;

/// Minimum length of the human-entered reason for suspend/cancel/resiliate
pub const MIN_REASON_LEN: usize = 10;

/// Named triggering actions, one per table row family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionAction {
    Finalize,
    Cancel,
    Suspend,
    Reactivate,
    Resiliate,
    Terminate,
    Renew,
}

impl TransitionAction {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Finalize => "finalize",
            TransitionAction::Cancel => "cancel",
            TransitionAction::Suspend => "suspend",
            TransitionAction::Reactivate => "reactivate",
            TransitionAction::Resiliate => "resiliate",
            TransitionAction::Terminate => "terminate",
            TransitionAction::Renew => "renew",
        }
    }
}

impl std::fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boolean gates evaluated against a [`TransitionContext`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Every cosigner of the contract has signed
    AllCosignersSigned,
    /// At least one linked meter is in an active state
    ActiveMeterLinked,
    /// The caller supplied a reason of at least [`MIN_REASON_LEN`] chars
    ReasonMinLength,
    /// The target date is today or later
    DateNotInPast,
    /// The target date lies within the context horizon of today
    DateWithinHorizon,
}

impl Precondition {
    /// Stable violation name surfaced to callers
    pub const fn name(&self) -> &'static str {
        match self {
            Precondition::AllCosignersSigned => "signatures_incomplete",
            Precondition::ActiveMeterLinked => "meter_required",
            Precondition::ReasonMinLength => "reason_too_short",
            Precondition::DateNotInPast => "date_in_past",
            Precondition::DateWithinHorizon => "date_too_far",
        }
    }

    fn holds(&self, ctx: &TransitionContext<'_>) -> bool {
        match self {
            Precondition::AllCosignersSigned => ctx.cosigners.iter().all(|c| c.signed),
            Precondition::ActiveMeterLinked => ctx.active_meter_count > 0,
            Precondition::ReasonMinLength => ctx
                .reason
                .map(|r| r.trim().chars().count() >= MIN_REASON_LEN)
                .unwrap_or(false),
            Precondition::DateNotInPast => {
                ctx.target_date.map(|d| d >= ctx.today).unwrap_or(false)
            }
            Precondition::DateWithinHorizon => ctx
                .target_date
                .and_then(|d| horizon(ctx.today, ctx.max_target_years).map(|h| d <= h))
                .unwrap_or(false),
        }
    }
}

fn horizon(today: NaiveDate, years: i32) -> Option<NaiveDate> {
    // Feb 29 clamps to Feb 28 in a non-leap target year
    today
        .with_year(today.year() + years)
        .or_else(|| today.with_day(28)?.with_year(today.year() + years))
}

/// Post-transition effects carried out by the orchestrator after the state
/// change is persisted. None of them may reverse the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Audit(AuditAction),
    Notify(&'static str),
    ReleaseMeter,
}

/// One row of the transition table
#[derive(Debug)]
pub struct TransitionSpec {
    pub from: ContractState,
    pub to: ContractState,
    pub action: TransitionAction,
    pub preconditions: &'static [Precondition],
    pub effects: &'static [Effect],
}

/// Exhaustive transition table. Nothing outside this list is a legal move.
pub static TRANSITIONS: &[TransitionSpec] = &[
    TransitionSpec {
        from: ContractState::Pending,
        to: ContractState::Active,
        action: TransitionAction::Finalize,
        preconditions: &[Precondition::ActiveMeterLinked, Precondition::AllCosignersSigned],
        effects: &[
            Effect::Audit(AuditAction::Activation),
            Effect::Notify("contract.activated"),
        ],
    },
    TransitionSpec {
        from: ContractState::Pending,
        to: ContractState::Cancelled,
        action: TransitionAction::Cancel,
        preconditions: &[Precondition::ReasonMinLength],
        effects: &[
            Effect::Audit(AuditAction::Cancellation),
            Effect::Notify("contract.cancelled"),
        ],
    },
    TransitionSpec {
        from: ContractState::Active,
        to: ContractState::Cancelled,
        action: TransitionAction::Cancel,
        preconditions: &[Precondition::ReasonMinLength],
        effects: &[
            Effect::Audit(AuditAction::Cancellation),
            Effect::Notify("contract.cancelled"),
        ],
    },
    TransitionSpec {
        from: ContractState::Active,
        to: ContractState::Suspended,
        action: TransitionAction::Suspend,
        preconditions: &[Precondition::ReasonMinLength],
        effects: &[
            Effect::Audit(AuditAction::Suspension),
            Effect::Notify("contract.suspended"),
        ],
    },
    TransitionSpec {
        from: ContractState::Suspended,
        to: ContractState::Active,
        action: TransitionAction::Reactivate,
        preconditions: &[],
        effects: &[
            Effect::Audit(AuditAction::Reactivation),
            Effect::Notify("contract.reactivated"),
        ],
    },
    TransitionSpec {
        from: ContractState::Active,
        to: ContractState::Resiliated,
        action: TransitionAction::Resiliate,
        preconditions: &[Precondition::ReasonMinLength],
        effects: &[
            Effect::Audit(AuditAction::Resiliation),
            Effect::Notify("contract.resiliated"),
            Effect::ReleaseMeter,
        ],
    },
    TransitionSpec {
        from: ContractState::Suspended,
        to: ContractState::Resiliated,
        action: TransitionAction::Resiliate,
        preconditions: &[Precondition::ReasonMinLength],
        effects: &[
            Effect::Audit(AuditAction::Resiliation),
            Effect::Notify("contract.resiliated"),
            Effect::ReleaseMeter,
        ],
    },
    TransitionSpec {
        from: ContractState::Active,
        to: ContractState::Terminated,
        action: TransitionAction::Terminate,
        preconditions: &[],
        effects: &[
            Effect::Audit(AuditAction::Termination),
            Effect::Notify("contract.terminated"),
        ],
    },
    TransitionSpec {
        from: ContractState::Active,
        to: ContractState::Active,
        action: TransitionAction::Renew,
        preconditions: &[Precondition::DateNotInPast, Precondition::DateWithinHorizon],
        effects: &[
            Effect::Audit(AuditAction::Renewal),
            Effect::Notify("contract.renewed"),
        ],
    },
];

/// Everything the preconditions may inspect, assembled by the orchestrator
/// before validation
pub struct TransitionContext<'a> {
    pub cosigners: &'a [Cosigner],
    pub active_meter_count: usize,
    pub reason: Option<&'a str>,
    pub target_date: Option<NaiveDate>,
    pub today: NaiveDate,
    /// Horizon for [`Precondition::DateWithinHorizon`], in years
    pub max_target_years: i32,
}

impl<'a> TransitionContext<'a> {
    /// Context with no cosigners, meters, reason or date, and the default
    /// horizon. Useful for transitions whose rows declare no preconditions.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            cosigners: &[],
            active_meter_count: 0,
            reason: None,
            target_date: None,
            today,
            max_target_years: MAX_TARGET_YEARS,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No transition {action} from {from} to {to}")]
    Unknown {
        from: ContractState,
        to: ContractState,
        action: TransitionAction,
    },
    #[error("Preconditions violated: {0:?}")]
    Violations(Vec<&'static str>),
}

/// Table row for `(from, action)`, if any
pub fn find_transition(
    from: ContractState,
    action: TransitionAction,
) -> Option<&'static TransitionSpec> {
    TRANSITIONS
        .iter()
        .find(|t| t.from == from && t.action == action)
}

/// Target state the table declares for `(from, action)`
pub fn target_for(from: ContractState, action: TransitionAction) -> Option<ContractState> {
    find_transition(from, action).map(|t| t.to)
}

/// Check that `(current, target, action)` is a table row whose preconditions
/// all hold. Collects every violation; never fail-fast.
pub fn validate_transition(
    current: ContractState,
    target: ContractState,
    action: TransitionAction,
    ctx: &TransitionContext<'_>,
) -> Result<&'static TransitionSpec, TransitionError> {
    let spec = find_transition(current, action)
        .filter(|t| t.to == target)
        .ok_or(TransitionError::Unknown {
            from: current,
            to: target,
            action,
        })?;

    let violations: Vec<&'static str> = spec
        .preconditions
        .iter()
        .filter(|p| !p.holds(ctx))
        .map(|p| p.name())
        .collect();

    if violations.is_empty() {
        Ok(spec)
    } else {
        Err(TransitionError::Violations(violations))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{CosignerRole, InvitationState, PartyRef};

    fn cosigner(signed: bool) -> Cosigner {
        let now = shared::util::now_millis();
        Cosigner {
            id: shared::util::new_id(),
            contract_id: "c-1".into(),
            party: PartyRef::Individual("p-1".into()),
            role: CosignerRole::Secondary,
            share_percentage: 50.0,
            invitation_state: if signed {
                InvitationState::Accepted
            } else {
                InvitationState::Sent
            },
            signed,
            signed_at: signed.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[test]
    fn test_unknown_triples_rejected() {
        let ctx = TransitionContext::empty(today());
        // Terminal states have no outgoing rows
        for from in [
            ContractState::Terminated,
            ContractState::Cancelled,
            ContractState::Resiliated,
        ] {
            for action in [
                TransitionAction::Finalize,
                TransitionAction::Suspend,
                TransitionAction::Reactivate,
                TransitionAction::Resiliate,
                TransitionAction::Renew,
            ] {
                assert!(matches!(
                    validate_transition(from, ContractState::Active, action, &ctx),
                    Err(TransitionError::Unknown { .. })
                ));
            }
        }
        // Row exists for (from, action) but the target does not match
        assert!(matches!(
            validate_transition(
                ContractState::Pending,
                ContractState::Suspended,
                TransitionAction::Finalize,
                &ctx
            ),
            Err(TransitionError::Unknown { .. })
        ));
    }

    #[test]
    fn test_finalize_collects_all_violations() {
        let unsigned = [cosigner(false)];
        let ctx = TransitionContext {
            cosigners: &unsigned,
            active_meter_count: 0,
            ..TransitionContext::empty(today())
        };
        let err = validate_transition(
            ContractState::Pending,
            ContractState::Active,
            TransitionAction::Finalize,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Violations(vec!["meter_required", "signatures_incomplete"])
        );
    }

    #[test]
    fn test_finalize_passes_with_meter_and_signatures() {
        let signed = [cosigner(true), cosigner(true)];
        let ctx = TransitionContext {
            cosigners: &signed,
            active_meter_count: 1,
            ..TransitionContext::empty(today())
        };
        let spec = validate_transition(
            ContractState::Pending,
            ContractState::Active,
            TransitionAction::Finalize,
            &ctx,
        )
        .unwrap();
        assert_eq!(spec.to, ContractState::Active);
        assert!(spec.effects.contains(&Effect::Audit(AuditAction::Activation)));
    }

    #[test]
    fn test_reason_length_gate() {
        let mut ctx = TransitionContext::empty(today());
        ctx.reason = Some("too short");
        let err = validate_transition(
            ContractState::Active,
            ContractState::Resiliated,
            TransitionAction::Resiliate,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::Violations(vec!["reason_too_short"]));

        ctx.reason = Some("tenant moved out");
        let spec = validate_transition(
            ContractState::Active,
            ContractState::Resiliated,
            TransitionAction::Resiliate,
            &ctx,
        )
        .unwrap();
        assert!(spec.effects.contains(&Effect::ReleaseMeter));
    }

    #[test]
    fn test_renew_date_window() {
        let mut ctx = TransitionContext::empty(today());

        ctx.target_date = Some(NaiveDate::from_ymd_opt(2025, 6, 14).unwrap());
        let err = validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::Violations(vec!["date_in_past"]));

        ctx.target_date = Some(NaiveDate::from_ymd_opt(2030, 6, 16).unwrap());
        let err = validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::Violations(vec!["date_too_far"]));

        ctx.target_date = Some(NaiveDate::from_ymd_opt(2030, 6, 15).unwrap());
        assert!(validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .is_ok());
    }

    #[test]
    fn test_horizon_follows_context_setting() {
        let mut ctx = TransitionContext::empty(today());
        ctx.max_target_years = 1;

        ctx.target_date = Some(NaiveDate::from_ymd_opt(2026, 6, 16).unwrap());
        let err = validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::Violations(vec!["date_too_far"]));

        ctx.target_date = Some(NaiveDate::from_ymd_opt(2026, 6, 15).unwrap());
        assert!(validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .is_ok());
    }

    #[test]
    fn test_missing_context_values_count_as_violations() {
        // No reason supplied at all
        let ctx = TransitionContext::empty(today());
        let err = validate_transition(
            ContractState::Active,
            ContractState::Suspended,
            TransitionAction::Suspend,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(err, TransitionError::Violations(vec!["reason_too_short"]));

        // No target date supplied for renew: both date gates fail
        let err = validate_transition(
            ContractState::Active,
            ContractState::Active,
            TransitionAction::Renew,
            &ctx,
        )
        .unwrap_err();
        assert_eq!(
            err,
            TransitionError::Violations(vec!["date_in_past", "date_too_far"])
        );
    }

    #[test]
    fn test_target_for_matches_table() {
        assert_eq!(
            target_for(ContractState::Pending, TransitionAction::Finalize),
            Some(ContractState::Active)
        );
        assert_eq!(
            target_for(ContractState::Suspended, TransitionAction::Resiliate),
            Some(ContractState::Resiliated)
        );
        assert_eq!(
            target_for(ContractState::Pending, TransitionAction::Suspend),
            None
        );
    }
}
