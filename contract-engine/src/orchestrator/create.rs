//! Contract creation
//!
//! Ordering matters: every structural check and external validation runs
//! before the persistence transaction, so a rejected payload never mutates
//! anything. Meter provisioning is the one compensable pre-persistence
//! step: if persistence then fails, the freshly provisioned meter is
//! released again. Intervention scheduling and notifications come last and
//! are fire-and-forget.

use super::{Orchestrator, Saga};
use crate::audit::AuditAction;
use crate::db::repository::{contract as contract_repo, cosigner as cosigner_repo};
use crate::external::InterventionRequest;
use serde_json::json;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Contract, ContractCreate, ContractState, Cosigner, InvitationState, SignatureState,
};
use tracing::{info, warn};

/// Installation visits are planned one week out by default
const INSTALLATION_LEAD_MS: i64 = 7 * 24 * 3600 * 1000;

impl Orchestrator {
    pub async fn create_contract(
        &self,
        payload: ContractCreate,
        actor: Option<&str>,
    ) -> AppResult<Contract> {
        let mut saga = Saga::new("create_contract");

        // 1. Structural and business-rule validation, all violations collected
        crate::validation::validate_create(&payload, Self::today())?;
        saga.done("validate");

        // 2. Owner and cosigner parties must be active in the client registry
        let owner = self
            .clients
            .get_client(payload.owner.id(), &payload.tenant_id)
            .await
            .map_err(AppError::from)?;
        if !owner.is_active() {
            return Err(AppError::new(ErrorCode::ClientInactive)
                .with_detail("party", payload.owner.to_string()));
        }
        let mut cosigner_clients = Vec::with_capacity(payload.cosigners.len());
        for cosigner in &payload.cosigners {
            let client = self
                .clients
                .get_client(cosigner.party.id(), &payload.tenant_id)
                .await
                .map_err(AppError::from)?;
            if !client.is_active() {
                return Err(AppError::new(ErrorCode::ClientInactive)
                    .with_detail("party", cosigner.party.to_string()));
            }
            cosigner_clients.push(client);
        }
        saga.done("check_parties");

        // 3. Resolve a meter: explicit id wins, otherwise provision for the
        // service address. Provisioning failure is non-fatal.
        let mut meter_id = payload.meter_id.clone();
        let mut provisioned_this_run = false;
        if meter_id.is_none() {
            if let Some(address) = payload.service_address.as_deref() {
                match self
                    .meters
                    .provision_meter(address, &payload.zone, &payload.tenant_id, None)
                    .await
                {
                    Ok(provisioned) => {
                        info!(
                            meter_id = %provisioned.id,
                            number = %provisioned.number,
                            "Meter provisioned"
                        );
                        meter_id = Some(provisioned.id.clone());
                        provisioned_this_run = true;
                        let meters = self.meters.clone();
                        saga.done_with("provision_meter", move || {
                            Box::pin(async move {
                                meters
                                    .release_meter(&provisioned.id)
                                    .await
                                    .map_err(|e| e.to_string())
                            })
                        });
                    }
                    Err(e) => {
                        warn!("Meter provisioning failed, creating without meter: {e}");
                    }
                }
            }
        }

        // 4. Contract and cosigners in one transaction; a failure here
        // aborts the whole operation and releases any provisioned meter
        let now = shared::util::now_millis();
        let contract = Contract {
            id: shared::util::new_id(),
            tenant_id: payload.tenant_id.clone(),
            owner: payload.owner.clone(),
            business_number: None,
            zone: payload.zone.clone(),
            kind: payload.kind,
            state: ContractState::Pending,
            signature_state: SignatureState::Pending,
            start_date: payload.start_date,
            end_date: payload.end_date,
            total_amount: payload.total_amount,
            meter_ref: meter_id.clone(),
            subscription_ref: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        let cosigners: Vec<Cosigner> = payload
            .cosigners
            .iter()
            .map(|c| Cosigner {
                id: shared::util::new_id(),
                contract_id: contract.id.clone(),
                party: c.party.clone(),
                role: c.role,
                share_percentage: c.share_percentage,
                invitation_state: InvitationState::Sent,
                signed: false,
                signed_at: None,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let persisted: Result<(), crate::db::repository::RepoError> = async {
            let mut tx = self.pool.begin().await?;
            contract_repo::insert(&mut *tx, &contract).await?;
            for cosigner in &cosigners {
                cosigner_repo::insert(&mut *tx, cosigner).await?;
            }
            tx.commit().await?;
            Ok(())
        }
        .await;

        if let Err(e) = persisted {
            saga.failed("persist", e.to_string());
            let rolled_back = saga.compensate().await;
            if provisioned_this_run {
                return Err(AppError::partial_failure(
                    "create_contract",
                    rolled_back,
                    e.to_string(),
                ));
            }
            return Err(AppError::from(e));
        }
        saga.done("persist");

        // 5. Schedule the installation visit when a meter is in play
        if let Some(meter) = meter_id.as_deref() {
            let request = InterventionRequest {
                intervention_type: "installation".to_string(),
                contract_id: contract.id.clone(),
                meter_id: Some(meter.to_string()),
                planned_at: now + INSTALLATION_LEAD_MS,
                priority: 3,
            };
            if let Err(e) = self.interventions.schedule(&request).await {
                warn!(contract_id = %contract.id, "Intervention scheduling dropped: {e}");
            }
            saga.done("schedule_intervention");
        }

        // 6. Audit and creation notifications
        self.record_audit(
            &contract,
            AuditAction::Creation,
            actor,
            None,
            Some(contract.snapshot()),
        );
        // Owner and every cosigner get the creation notice
        for client in std::iter::once(&owner).chain(cosigner_clients.iter()) {
            if let Some(email) = client.email.as_deref() {
                self.email_best_effort(
                    email,
                    "Your supply contract has been created",
                    &format!("Contract for zone {} registered.", contract.zone),
                )
                .await;
            }
        }
        self.emit_best_effort(
            "contract.created",
            &json!({
                "contract_id": contract.id,
                "tenant_id": contract.tenant_id,
                "kind": contract.kind.as_str(),
                "zone": contract.zone,
                "cosigners": cosigners.len(),
            }),
        )
        .await;

        info!(contract_id = %contract.id, kind = %contract.kind, "Contract created");
        Ok(contract)
    }
}
