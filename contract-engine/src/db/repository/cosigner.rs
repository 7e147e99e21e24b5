//! Cosigner Repository
//!
//! The share-sum invariant (per-contract sum of `share_percentage` ≤ 100)
//! is enforced inside a single transaction here, so a violating insert or
//! update is rejected without partial application.

use super::{RepoError, RepoResult};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use shared::models::{Cosigner, CosignerRole, InvitationState, PartyRef};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const COLUMNS: &str = "id, contract_id, party_type, party_id, role, share_percentage, \
     invitation_state, signed, signed_at, created_at, updated_at";

const SHARE_CAP: f64 = 100.0;

fn map_row(row: &SqliteRow) -> RepoResult<Cosigner> {
    let party_type: String = row.try_get("party_type")?;
    let party_id: String = row.try_get("party_id")?;
    let role: String = row.try_get("role")?;
    let invitation_state: String = row.try_get("invitation_state")?;
    let signed: i64 = row.try_get("signed")?;

    Ok(Cosigner {
        id: row.try_get("id")?,
        contract_id: row.try_get("contract_id")?,
        party: PartyRef::from_parts(&party_type, party_id)
            .ok_or_else(|| RepoError::Database(format!("Unknown party_type '{party_type}'")))?,
        role: CosignerRole::parse(&role)
            .ok_or_else(|| RepoError::Database(format!("Unknown role '{role}'")))?,
        share_percentage: row.try_get("share_percentage")?,
        invitation_state: InvitationState::parse(&invitation_state).ok_or_else(|| {
            RepoError::Database(format!("Unknown invitation_state '{invitation_state}'"))
        })?,
        signed: signed != 0,
        signed_at: row.try_get("signed_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Decimal share arithmetic; float addition must not decide a boundary case
fn share_sum_exceeds(existing: f64, added: f64) -> Option<f64> {
    let sum = Decimal::from_f64(existing).unwrap_or_default()
        + Decimal::from_f64(added).unwrap_or_default();
    let cap = Decimal::from_f64(SHARE_CAP).unwrap_or_default();
    if sum > cap {
        Some(sum.to_f64().unwrap_or(f64::MAX))
    } else {
        None
    }
}

/// Plain insert on any executor (used inside the create-contract transaction
/// after the rule-set already validated the full cosigner list)
pub async fn insert<'e, E>(executor: E, c: &Cosigner) -> RepoResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO cosigner (id, contract_id, party_type, party_id, role, share_percentage, \
         invitation_state, signed, signed_at, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&c.id)
    .bind(&c.contract_id)
    .bind(c.party.kind())
    .bind(c.party.id())
    .bind(c.role.as_str())
    .bind(c.share_percentage)
    .bind(c.invitation_state.as_str())
    .bind(c.signed as i64)
    .bind(c.signed_at)
    .bind(c.created_at)
    .bind(c.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

/// Insert with the share-sum guard evaluated in the same transaction
pub async fn insert_guarded(pool: &SqlitePool, c: &Cosigner) -> RepoResult<()> {
    let mut tx = pool.begin().await?;

    let existing: f64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(share_percentage), 0.0) FROM cosigner WHERE contract_id = ?",
    )
    .bind(&c.contract_id)
    .fetch_one(&mut *tx)
    .await?;

    if let Some(attempted) = share_sum_exceeds(existing, c.share_percentage) {
        return Err(RepoError::ShareExceeded { attempted });
    }

    insert(&mut *tx, c).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Cosigner>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM cosigner WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_row).transpose()
}

pub async fn find_by_contract(pool: &SqlitePool, contract_id: &str) -> RepoResult<Vec<Cosigner>> {
    let rows = sqlx::query(&format!(
        "SELECT {COLUMNS} FROM cosigner WHERE contract_id = ? ORDER BY created_at"
    ))
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(map_row).collect()
}

/// Update role / share / invitation state; the share-sum guard runs against
/// the other cosigners of the same contract inside one transaction
pub async fn update_guarded(
    pool: &SqlitePool,
    id: &str,
    role: Option<CosignerRole>,
    share_percentage: Option<f64>,
    invitation_state: Option<InvitationState>,
) -> RepoResult<Cosigner> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM cosigner WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
    let current = row
        .as_ref()
        .map(map_row)
        .transpose()?
        .ok_or_else(|| RepoError::NotFound(format!("Cosigner {id} not found")))?;

    if let Some(share) = share_percentage {
        let others: f64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(share_percentage), 0.0) FROM cosigner \
             WHERE contract_id = ? AND id != ?",
        )
        .bind(&current.contract_id)
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
        if let Some(attempted) = share_sum_exceeds(others, share) {
            return Err(RepoError::ShareExceeded { attempted });
        }
    }

    let now = shared::util::now_millis();
    sqlx::query(
        "UPDATE cosigner SET role = COALESCE(?, role), \
         share_percentage = COALESCE(?, share_percentage), \
         invitation_state = COALESCE(?, invitation_state), updated_at = ? WHERE id = ?",
    )
    .bind(role.map(|r| r.as_str()))
    .bind(share_percentage)
    .bind(invitation_state.map(|s| s.as_str()))
    .bind(now)
    .bind(id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Cosigner {id} not found")))
}

/// Record the signature; idempotent, keeps the first signature timestamp
pub async fn mark_signed(pool: &SqlitePool, id: &str) -> RepoResult<Cosigner> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE cosigner SET signed = 1, signed_at = COALESCE(signed_at, ?), \
         invitation_state = 'ACCEPTED', updated_at = ? WHERE id = ?",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?
    .rows_affected();

    if rows == 0 {
        return Err(RepoError::NotFound(format!("Cosigner {id} not found")));
    }
    find_by_id(pool, id)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("Cosigner {id} not found")))
}
