//! Finalize (activation)
//!
//! The representative saga. Steps, in order: state gate, external active-
//! meter check, local signature check, number minting with a defensive
//! uniqueness re-check, the single mutation to `Active`, audit, operations
//! notify. A notify failure compensates the mutation (state back to
//! `Pending`, number cleared when it was minted in this run) and surfaces
//! as `PartialFailure`. The allocated sequence value is never reclaimed.
//!
//! The span from the persisted mutation through its compensation runs on a
//! task of its own: a caller dropping the `finalize` future cannot leave
//! the contract active with the notify and compensation abandoned.

use super::{Orchestrator, Saga};
use crate::audit::{AuditAction, AuditEntry, AuditService};
use crate::db::repository::contract as contract_repo;
use crate::db::repository::RepoError;
use crate::external::NotificationDispatcher;
use crate::lifecycle::{
    validate_transition, TransitionAction, TransitionContext, TransitionError,
};
use crate::numbering::{format_contract_number, zone_code};
use chrono::Datelike;
use serde_json::{json, Value};
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{Contract, ContractState};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, info};

impl Orchestrator {
    pub async fn finalize(&self, id: &str, actor: Option<&str>) -> AppResult<Contract> {
        let mut saga = Saga::new("finalize");

        // 1-3. State gate plus both preconditions, violations collected
        let contract = self.load_contract(id).await?;
        let cosigners = self.load_cosigners(id).await?;
        let active_meters = self.active_meter_count(&contract).await?;
        let ctx = TransitionContext {
            cosigners: &cosigners,
            active_meter_count: active_meters,
            reason: None,
            target_date: None,
            today: Self::today(),
            max_target_years: self.max_target_years,
        };
        validate_transition(
            contract.state,
            ContractState::Active,
            TransitionAction::Finalize,
            &ctx,
        )
        .map_err(|e| transition_error("finalize", e))?;
        saga.done("validate_preconditions");

        // 4. Mint a number unless one is already bound, then re-check
        // uniqueness before touching the contract
        let (business_number, minted_this_run) = match contract.business_number.clone() {
            Some(number) => (number, false),
            None => {
                let zone = zone_code(&contract.zone).ok_or_else(|| {
                    AppError::new(ErrorCode::ZoneNotEncodable).with_detail("zone", contract.zone.clone())
                })?;
                let year = Self::today().year();
                let seq = self
                    .allocator
                    .next_contract(&zone, year)
                    .await
                    .map_err(AppError::from)?;
                let number = format_contract_number(contract.kind, &zone, year, seq)
                    .map_err(|e| AppError::internal(e.to_string()))?;
                if contract_repo::business_number_exists(&self.pool, &number)
                    .await
                    .map_err(AppError::from)?
                {
                    return Err(AppError::sequence_conflict(number));
                }
                (number, true)
            }
        };
        saga.done("mint_number");

        // 5-7. Mutation, audit and notify run to completion even if this
        // future is dropped; only the compensation may undo the mutation
        let span = ActivationSpan {
            pool: self.pool.clone(),
            audit: self.audit.clone(),
            notifications: self.notifications.clone(),
            saga,
            id: id.to_string(),
            actor: actor.map(str::to_string),
            business_number,
            minted_this_run,
            expected_version: contract.version,
            before: contract.snapshot(),
        };
        match tokio::spawn(activate_and_notify(span)).await {
            Ok(result) => result,
            Err(e) => Err(AppError::internal(format!("Finalize task aborted: {e}"))),
        }
    }
}

/// Everything the detached activation span needs, cloned off the
/// orchestrator before the mutation
struct ActivationSpan {
    pool: SqlitePool,
    audit: AuditService,
    notifications: Arc<dyn NotificationDispatcher>,
    saga: Saga,
    id: String,
    actor: Option<String>,
    business_number: String,
    minted_this_run: bool,
    expected_version: i64,
    before: Value,
}

async fn activate_and_notify(span: ActivationSpan) -> AppResult<Contract> {
    let ActivationSpan {
        pool,
        audit,
        notifications,
        mut saga,
        id,
        actor,
        business_number,
        minted_this_run,
        expected_version,
        before,
    } = span;

    // 5. The single mutation, guarded by the optimistic version
    contract_repo::finalize(&pool, &id, expected_version, &business_number)
        .await
        .map_err(|e| activation_error(&business_number, e))?;
    let activated = load(&pool, &id).await?;
    {
        let pool = pool.clone();
        let contract_id = id.clone();
        let version = activated.version;
        saga.done_with("activate", move || {
            Box::pin(async move {
                revert_activation(&pool, &contract_id, version, minted_this_run).await
            })
        });
    }

    // 6. Audit the activation
    record(
        &audit,
        &activated,
        AuditAction::Activation,
        actor.as_deref(),
        Some(before),
        Some(activated.snapshot()),
    );

    // 7. Operations notify; the one external call whose failure undoes
    // the mutation
    let notify_result = notifications
        .emit_event(
            "contract.activated",
            &json!({
                "contract_id": activated.id,
                "tenant_id": activated.tenant_id,
                "business_number": business_number,
            }),
        )
        .await;

    if let Err(e) = notify_result {
        saga.failed("notify_operations", e.to_string());
        let rolled_back = saga.compensate().await;
        if rolled_back {
            let reverted = load(&pool, &id).await?;
            record(
                &audit,
                &reverted,
                AuditAction::Compensation,
                actor.as_deref(),
                Some(activated.snapshot()),
                Some(reverted.snapshot()),
            );
        } else {
            error!(contract_id = %id, "Activation compensation failed, contract left active");
        }
        return Err(AppError::partial_failure("finalize", rolled_back, e.to_string()));
    }

    info!(
        contract_id = %activated.id,
        business_number = %business_number,
        "Contract finalized"
    );
    Ok(activated)
}

async fn load(pool: &SqlitePool, id: &str) -> AppResult<Contract> {
    contract_repo::find_by_id(pool, id)
        .await
        .map_err(AppError::from)?
        .ok_or_else(|| AppError::contract_not_found(id))
}

fn record(
    audit: &AuditService,
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
    audit.record(entry);
}

/// A unique violation on the activation write is a numbering collision that
/// slipped past the pre-mutation re-check, not a generic duplicate
fn activation_error(business_number: &str, e: RepoError) -> AppError {
    match e {
        RepoError::Duplicate(_) => AppError::sequence_conflict(business_number),
        other => AppError::from(other),
    }
}

async fn revert_activation(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    clear_number: bool,
) -> Result<(), String> {
    contract_repo::revert_finalize(pool, id, version, clear_number)
        .await
        .map_err(|e| e.to_string())
}

pub(crate) fn transition_error(action: &str, e: TransitionError) -> AppError {
    match e {
        TransitionError::Unknown { from, to, .. } => {
            AppError::invalid_transition(action, Vec::new())
                .with_detail("from", from.as_str())
                .with_detail("to", to.as_str())
        }
        TransitionError::Violations(violations) => AppError::invalid_transition(
            action,
            violations.into_iter().map(String::from).collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_unique_violation_is_a_sequence_conflict() {
        let err = activation_error(
            "C-P-TLS-25-00001",
            RepoError::Duplicate("UNIQUE constraint failed: contract.business_number".into()),
        );
        assert_eq!(err.code, ErrorCode::SequenceConflict);

        let err = activation_error(
            "C-P-TLS-25-00001",
            RepoError::VersionConflict("contract version moved".into()),
        );
        assert_eq!(err.code, ErrorCode::TransitionConflict);
    }
}
