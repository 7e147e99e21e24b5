//! Guarded single-transition operations
//!
//! Suspend, reactivate, resiliate, renew, cancel and terminate all follow
//! the same shape: validate against the transition table, persist the state
//! change under the optimistic version guard, then run the declared
//! downstream effects. Effects are at-least-once and fire-and-log: none of
//! them may block or reverse the persisted transition.

use super::finalize::transition_error;
use super::Orchestrator;
use crate::audit::AuditAction;
use crate::db::repository::contract as contract_repo;
use crate::lifecycle::{
    target_for, validate_transition, Effect, TransitionAction, TransitionContext,
};
use chrono::NaiveDate;
use serde_json::json;
use shared::error::{AppError, AppResult};
use shared::models::Contract;
use tracing::{info, warn};

impl Orchestrator {
    pub async fn suspend(&self, id: &str, reason: &str, actor: Option<&str>) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Suspend, Some(reason), None, actor)
            .await
    }

    pub async fn reactivate(&self, id: &str, actor: Option<&str>) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Reactivate, None, None, actor)
            .await
    }

    pub async fn resiliate(
        &self,
        id: &str,
        reason: &str,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Resiliate, Some(reason), None, actor)
            .await
    }

    pub async fn cancel(&self, id: &str, reason: &str, actor: Option<&str>) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Cancel, Some(reason), None, actor)
            .await
    }

    pub async fn terminate(&self, id: &str, actor: Option<&str>) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Terminate, None, None, actor)
            .await
    }

    /// Extend an active contract to a new end date. The table row is the
    /// self-transition `Active -> Active`; the mutation is the end date.
    pub async fn renew(
        &self,
        id: &str,
        new_end_date: NaiveDate,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        self.run_transition(id, TransitionAction::Renew, None, Some(new_end_date), actor)
            .await
    }

    async fn run_transition(
        &self,
        id: &str,
        action: TransitionAction,
        reason: Option<&str>,
        target_date: Option<NaiveDate>,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        let contract = self.load_contract(id).await?;

        // Validate against the table; an absent row surfaces as an unknown
        // transition carrying the current state
        let target = target_for(contract.state, action).unwrap_or(contract.state);
        let ctx = TransitionContext {
            cosigners: &[],
            active_meter_count: 0,
            reason,
            target_date,
            today: Self::today(),
            max_target_years: self.max_target_years,
        };
        let spec = validate_transition(contract.state, target, action, &ctx)
            .map_err(|e| transition_error(action.as_str(), e))?;

        // Persist under the version guard; a losing concurrent writer gets
        // a conflict here and must re-read
        let before = contract.snapshot();
        match action {
            TransitionAction::Renew => {
                // target_date passed validation above
                let end = target_date.ok_or_else(|| AppError::validation("Missing renewal date"))?;
                contract_repo::set_end_date(&self.pool, id, contract.version, end)
                    .await
                    .map_err(AppError::from)?;
            }
            _ => {
                contract_repo::set_state(&self.pool, id, contract.version, spec.to)
                    .await
                    .map_err(AppError::from)?;
            }
        }
        let mut updated = self.load_contract(id).await?;
        info!(contract_id = %id, action = %action, state = %updated.state, "Transition applied");

        // Downstream effects, in table order
        for effect in spec.effects {
            match effect {
                Effect::Audit(audit_action) => {
                    let mut after = updated.snapshot();
                    if let Some(r) = reason {
                        after["reason"] = json!(r);
                    }
                    self.record_audit(&updated, *audit_action, actor, Some(before.clone()), Some(after));
                }
                Effect::Notify(topic) => {
                    self.emit_best_effort(
                        topic,
                        &json!({
                            "contract_id": updated.id,
                            "tenant_id": updated.tenant_id,
                            "state": updated.state.as_str(),
                        }),
                    )
                    .await;
                }
                Effect::ReleaseMeter => {
                    updated = self.release_linked_meter(updated, actor).await;
                }
            }
        }

        Ok(updated)
    }

    /// Best-effort meter release after a resiliation. A registry failure is
    /// logged; the transition stands either way.
    async fn release_linked_meter(&self, contract: Contract, actor: Option<&str>) -> Contract {
        let Some(meter_id) = contract.meter_ref.clone() else {
            return contract;
        };
        if let Err(e) = self.meters.release_meter(&meter_id).await {
            warn!(contract_id = %contract.id, meter_id, "Meter release dropped: {e}");
            return contract;
        }

        let before = contract.snapshot();
        match contract_repo::set_meter_ref(&self.pool, &contract.id, contract.version, None).await {
            Ok(()) => match self.load_contract(&contract.id).await {
                Ok(updated) => {
                    self.record_audit(
                        &updated,
                        AuditAction::MeterUnlink,
                        actor,
                        Some(before),
                        Some(updated.snapshot()),
                    );
                    updated
                }
                Err(e) => {
                    warn!(contract_id = %contract.id, "Reload after meter unlink failed: {e}");
                    contract
                }
            },
            Err(e) => {
                warn!(contract_id = %contract.id, meter_id, "Meter ref clear dropped: {e}");
                contract
            }
        }
    }
}
