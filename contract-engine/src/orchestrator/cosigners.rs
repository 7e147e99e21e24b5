//! Cosigner operations
//!
//! The share-sum invariant is enforced inside the repository transaction,
//! never here, so concurrent cosigner writes cannot race past the cap. A
//! signed cosigner is immutable unless the update carries the
//! administrative correction flag.

use super::Orchestrator;
use crate::audit::AuditAction;
use crate::db::repository::cosigner as cosigner_repo;
use serde_json::json;
use shared::error::{AppError, AppResult, ErrorCode};
use shared::models::{
    Cosigner, CosignerCreate, CosignerUpdate, InvitationState, SignatureState,
};
use tracing::info;
use validator::Validate;

impl Orchestrator {
    pub async fn add_cosigner(
        &self,
        contract_id: &str,
        payload: CosignerCreate,
        actor: Option<&str>,
    ) -> AppResult<Cosigner> {
        payload
            .validate()
            .map_err(|e| AppError::validation(e.to_string()))?;

        let contract = self.load_contract(contract_id).await?;
        if !contract.kind.allows_cosigners() {
            return Err(AppError::new(ErrorCode::CosignerNotAllowed)
                .with_detail("kind", contract.kind.as_str()));
        }
        if contract.state.is_terminal() {
            return Err(AppError::invalid_transition("add_cosigner", Vec::new())
                .with_detail("from", contract.state.as_str()));
        }

        let client = self
            .clients
            .get_client(payload.party.id(), &contract.tenant_id)
            .await
            .map_err(AppError::from)?;
        if !client.is_active() {
            return Err(AppError::new(ErrorCode::ClientInactive)
                .with_detail("party", payload.party.to_string()));
        }

        let now = shared::util::now_millis();
        let cosigner = Cosigner {
            id: shared::util::new_id(),
            contract_id: contract_id.to_string(),
            party: payload.party,
            role: payload.role,
            share_percentage: payload.share_percentage,
            invitation_state: InvitationState::Sent,
            signed: false,
            signed_at: None,
            created_at: now,
            updated_at: now,
        };
        cosigner_repo::insert_guarded(&self.pool, &cosigner)
            .await
            .map_err(AppError::from)?;

        self.record_audit(
            &contract,
            AuditAction::CosignerAdd,
            actor,
            None,
            Some(cosigner.snapshot()),
        );
        if let Some(email) = client.email.as_deref() {
            self.email_best_effort(
                email,
                "You have been added as a cosigner",
                &format!("Please review and sign contract {contract_id}."),
            )
            .await;
        }

        info!(contract_id, cosigner_id = %cosigner.id, "Cosigner added");
        Ok(cosigner)
    }

    pub async fn update_cosigner(
        &self,
        cosigner_id: &str,
        update: CosignerUpdate,
        actor: Option<&str>,
    ) -> AppResult<Cosigner> {
        if let Some(share) = update.share_percentage {
            if !(0.0..=100.0).contains(&share) {
                return Err(AppError::validation("share_percentage outside 0-100")
                    .with_detail("share_percentage", share));
            }
        }

        let current = cosigner_repo::find_by_id(&self.pool, cosigner_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::new(ErrorCode::CosignerNotFound).with_detail("cosigner_id", cosigner_id))?;

        if current.signed && !update.admin_override {
            return Err(AppError::new(ErrorCode::CosignerImmutable)
                .with_detail("cosigner_id", cosigner_id));
        }

        let before = current.snapshot();
        let updated = cosigner_repo::update_guarded(
            &self.pool,
            cosigner_id,
            update.role,
            update.share_percentage,
            update.invitation_state,
        )
        .await
        .map_err(AppError::from)?;

        let contract = self.load_contract(&updated.contract_id).await?;
        let mut after = updated.snapshot();
        if update.admin_override {
            after["admin_override"] = json!(true);
        }
        self.record_audit(
            &contract,
            AuditAction::CosignerUpdate,
            actor,
            Some(before),
            Some(after),
        );

        Ok(updated)
    }

    /// Record a cosigner's signature. Idempotent. When this completes the
    /// set, the contract's signature axis flips to `Signed`.
    pub async fn record_cosigner_signature(
        &self,
        cosigner_id: &str,
        actor: Option<&str>,
    ) -> AppResult<Cosigner> {
        let current = cosigner_repo::find_by_id(&self.pool, cosigner_id)
            .await
            .map_err(AppError::from)?
            .ok_or_else(|| AppError::new(ErrorCode::CosignerNotFound).with_detail("cosigner_id", cosigner_id))?;

        let before = current.snapshot();
        let signed = cosigner_repo::mark_signed(&self.pool, cosigner_id)
            .await
            .map_err(AppError::from)?;

        let contract = self.load_contract(&signed.contract_id).await?;
        self.record_audit(
            &contract,
            AuditAction::CosignerSignature,
            actor,
            Some(before),
            Some(signed.snapshot()),
        );
        self.emit_best_effort(
            "cosigner.signed",
            &json!({
                "contract_id": signed.contract_id,
                "cosigner_id": signed.id,
            }),
        )
        .await;

        // Flip the contract's signature axis once the set is complete
        let all = self.load_cosigners(&signed.contract_id).await?;
        if all.iter().all(|c| c.signed) && contract.signature_state != SignatureState::Signed {
            if let Err(e) = crate::db::repository::contract::set_signature_state(
                &self.pool,
                &contract.id,
                contract.version,
                SignatureState::Signed,
            )
            .await
            {
                // A concurrent writer bumping the version is fine; the axis
                // will converge on the next signature-affecting operation
                tracing::warn!(contract_id = %contract.id, "Signature state update dropped: {e}");
            }
        }

        info!(cosigner_id, contract_id = %signed.contract_id, "Cosigner signature recorded");
        Ok(signed)
    }
}
