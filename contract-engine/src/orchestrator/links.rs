//! Meter and subscription reference management

use super::Orchestrator;
use crate::audit::AuditAction;
use crate::db::repository::contract as contract_repo;
use serde_json::json;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::Contract;
use tracing::{info, warn};

impl Orchestrator {
    /// Bind an available meter to the contract
    pub async fn link_meter(
        &self,
        contract_id: &str,
        meter_id: &str,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        let contract = self.load_contract(contract_id).await?;
        if contract.state.is_terminal() {
            return Err(AppError::invalid_transition("link_meter", Vec::new())
                .with_detail("from", contract.state.as_str()));
        }
        // Never overwrite a live reference; the old meter would stay bound
        // in the registry with nobody left to release it
        if let Some(existing) = contract.meter_ref.as_deref() {
            return Err(AppError::with_message(
                ErrorCode::AlreadyExists,
                "A meter is already linked; unlink it first",
            )
            .with_detail("meter_id", existing));
        }

        let available = self
            .meters
            .check_availability(meter_id)
            .await
            .map_err(AppError::from)?;
        if !available {
            return Err(AppError::new(ErrorCode::MeterUnavailable).with_detail("meter_id", meter_id));
        }

        let before = contract.snapshot();
        contract_repo::set_meter_ref(&self.pool, contract_id, contract.version, Some(meter_id))
            .await
            .map_err(AppError::from)?;
        let updated = self.load_contract(contract_id).await?;

        self.record_audit(
            &updated,
            AuditAction::MeterLink,
            actor,
            Some(before),
            Some(updated.snapshot()),
        );
        self.emit_best_effort(
            "contract.meter_linked",
            &json!({ "contract_id": contract_id, "meter_id": meter_id }),
        )
        .await;

        info!(contract_id, meter_id, "Meter linked");
        Ok(updated)
    }

    /// Clear the meter reference and hand the meter back to the registry
    pub async fn unlink_meter(&self, contract_id: &str, actor: Option<&str>) -> AppResult<Contract> {
        let contract = self.load_contract(contract_id).await?;
        let Some(meter_id) = contract.meter_ref.clone() else {
            return Err(AppError::validation("No meter linked to this contract")
                .with_detail("contract_id", contract_id));
        };

        let before = contract.snapshot();
        contract_repo::set_meter_ref(&self.pool, contract_id, contract.version, None)
            .await
            .map_err(AppError::from)?;
        let updated = self.load_contract(contract_id).await?;

        // Registry-side release is best-effort; the local unlink stands
        if let Err(e) = self.meters.release_meter(&meter_id).await {
            warn!(contract_id, meter_id, "Meter release dropped: {e}");
        }

        self.record_audit(
            &updated,
            AuditAction::MeterUnlink,
            actor,
            Some(before),
            Some(updated.snapshot()),
        );

        info!(contract_id, meter_id, "Meter unlinked");
        Ok(updated)
    }

    /// Bind an active subscription to the contract
    pub async fn link_subscription(
        &self,
        contract_id: &str,
        subscription_id: &str,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        let contract = self.load_contract(contract_id).await?;
        if contract.state.is_terminal() {
            return Err(AppError::invalid_transition("link_subscription", Vec::new())
                .with_detail("from", contract.state.as_str()));
        }

        let subscription = self
            .subscriptions
            .get_subscription(subscription_id)
            .await
            .map_err(AppError::from)?;
        if !subscription.is_active() {
            return Err(AppError::new(ErrorCode::SubscriptionInactive)
                .with_detail("subscription_id", subscription_id));
        }

        let before = contract.snapshot();
        contract_repo::set_subscription_ref(
            &self.pool,
            contract_id,
            contract.version,
            Some(subscription_id),
        )
        .await
        .map_err(AppError::from)?;
        let updated = self.load_contract(contract_id).await?;

        self.record_audit(
            &updated,
            AuditAction::SubscriptionLink,
            actor,
            Some(before),
            Some(updated.snapshot()),
        );

        info!(contract_id, subscription_id, "Subscription linked");
        Ok(updated)
    }
}
