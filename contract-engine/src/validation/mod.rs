//! Create-contract rule set
//!
//! Runs after the derive-level field validation on [`ContractCreate`] and
//! checks the cross-field business rules. Like the state machine, every
//! violated rule is collected so the caller gets complete feedback, never
//! just the first failure.

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::ContractCreate;
use validator::Validate;

/// Cosigner shares of one contract may not sum past this
pub const SHARE_CAP: f64 = 100.0;

/// Collect every rule violation for a create payload
pub fn check_create(payload: &ContractCreate, today: NaiveDate) -> Vec<String> {
    let mut issues = Vec::new();

    // 1. Field-level constraints (lengths, ranges, charsets)
    if let Err(field_errors) = payload.validate() {
        for (field, errors) in field_errors.field_errors() {
            for e in errors {
                issues.push(format!("{field}: {}", e.code));
            }
        }
    }

    // 2. Cosigner cardinality per kind
    if !payload.kind.allows_cosigners() && !payload.cosigners.is_empty() {
        issues.push(format!(
            "cosigners: kind '{}' forbids cosigners",
            payload.kind
        ));
    }
    if payload.kind.requires_cosigner() && payload.cosigners.is_empty() {
        issues.push(format!(
            "cosigners: kind '{}' requires at least one cosigner",
            payload.kind
        ));
    }

    // 3. Share sum, in decimal so float noise never decides the boundary
    let share_sum: Decimal = payload
        .cosigners
        .iter()
        .map(|c| Decimal::from_f64(c.share_percentage).unwrap_or_default())
        .sum();
    if share_sum > Decimal::from_f64(SHARE_CAP).unwrap_or_default() {
        issues.push(format!(
            "cosigners: share percentages sum to {share_sum}, cap is {SHARE_CAP}"
        ));
    }

    // 4. Date ordering
    if payload.start_date < today {
        issues.push("start_date: must not be in the past".to_string());
    }
    if let Some(end) = payload.end_date {
        if end <= payload.start_date {
            issues.push("end_date: must be after start_date".to_string());
        }
    }

    // 5. Amount ceiling per kind
    if let Some(amount) = payload.total_amount {
        let ceiling = payload.kind.amount_ceiling();
        if Decimal::from_f64(amount).unwrap_or_default() > ceiling {
            issues.push(format!(
                "total_amount: {amount} exceeds the '{}' ceiling of {ceiling}",
                payload.kind
            ));
        }
    }

    issues
}

/// `Ok(())` or a `ValidationError` carrying every violation
pub fn validate_create(payload: &ContractCreate, today: NaiveDate) -> Result<(), AppError> {
    let issues = check_create(payload, today);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(
            AppError::with_message(ErrorCode::ValidationFailed, "Contract payload rejected")
                .with_detail("violations", issues),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ContractKind, CosignerCreate, CosignerRole, PartyRef};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    fn cosigner(share: f64) -> CosignerCreate {
        CosignerCreate {
            party: PartyRef::Individual(shared::util::new_id()),
            role: CosignerRole::Secondary,
            share_percentage: share,
        }
    }

    fn base(kind: ContractKind) -> ContractCreate {
        ContractCreate {
            tenant_id: "t-1".into(),
            owner: PartyRef::Individual("u-1".into()),
            zone: "TLS".into(),
            kind,
            start_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            end_date: None,
            total_amount: None,
            meter_id: None,
            service_address: None,
            subscription_id: None,
            cosigners: vec![],
        }
    }

    #[test]
    fn test_clean_payload_passes() {
        assert!(validate_create(&base(ContractKind::Individual), today()).is_ok());
    }

    #[test]
    fn test_administration_forbids_cosigners() {
        let mut payload = base(ContractKind::Administration);
        payload.cosigners = vec![cosigner(10.0)];
        let issues = check_create(&payload, today());
        assert!(issues.iter().any(|i| i.contains("forbids cosigners")));
    }

    #[test]
    fn test_collectivity_requires_cosigner() {
        let payload = base(ContractKind::Collectivity);
        let issues = check_create(&payload, today());
        assert!(issues.iter().any(|i| i.contains("requires at least one")));
    }

    #[test]
    fn test_share_sum_over_cap() {
        let mut payload = base(ContractKind::Collectivity);
        payload.cosigners = vec![cosigner(60.0), cosigner(50.0)];
        let issues = check_create(&payload, today());
        assert!(issues.iter().any(|i| i.contains("sum to 110")));
    }

    #[test]
    fn test_amount_ceiling_per_kind() {
        let mut payload = base(ContractKind::Individual);
        payload.total_amount = Some(150_000.0);
        let issues = check_create(&payload, today());
        assert!(issues.iter().any(|i| i.contains("ceiling")));

        // The same amount is fine for a professional contract
        let mut payload = base(ContractKind::Professional);
        payload.total_amount = Some(150_000.0);
        assert!(check_create(&payload, today()).is_empty());
    }

    #[test]
    fn test_all_violations_collected_together() {
        let mut payload = base(ContractKind::Administration);
        payload.cosigners = vec![cosigner(70.0), cosigner(60.0)];
        payload.start_date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        payload.total_amount = Some(99_000_000.0);
        let issues = check_create(&payload, today());
        assert!(issues.len() >= 4, "got {issues:?}");

        let err = validate_create(&payload, today()).unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
    }

    #[test]
    fn test_end_date_must_follow_start() {
        let mut payload = base(ContractKind::Individual);
        payload.end_date = Some(payload.start_date);
        let issues = check_create(&payload, today());
        assert!(issues.iter().any(|i| i.contains("end_date")));
    }
}
