//! Contract Repository
//!
//! All mutating statements are guarded by `WHERE id = ? AND version = ?`
//! and bump `version`; zero affected rows means a concurrent writer won.

use super::{RepoError, RepoResult};
use chrono::NaiveDate;
use shared::models::{Contract, ContractKind, ContractState, PartyRef, SignatureState};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

const COLUMNS: &str = "id, tenant_id, owner_type, owner_id, business_number, zone, kind, state, \
     signature_state, start_date, end_date, total_amount, meter_ref, subscription_ref, \
     version, created_at, updated_at";

fn map_row(row: &SqliteRow) -> RepoResult<Contract> {
    let owner_type: String = row.try_get("owner_type")?;
    let owner_id: String = row.try_get("owner_id")?;
    let owner = PartyRef::from_parts(&owner_type, owner_id)
        .ok_or_else(|| RepoError::Database(format!("Unknown owner_type '{owner_type}'")))?;

    let kind: String = row.try_get("kind")?;
    let state: String = row.try_get("state")?;
    let signature_state: String = row.try_get("signature_state")?;
    let start_date: String = row.try_get("start_date")?;
    let end_date: Option<String> = row.try_get("end_date")?;

    Ok(Contract {
        id: row.try_get("id")?,
        tenant_id: row.try_get("tenant_id")?,
        owner,
        business_number: row.try_get("business_number")?,
        zone: row.try_get("zone")?,
        kind: ContractKind::parse(&kind)
            .ok_or_else(|| RepoError::Database(format!("Unknown kind '{kind}'")))?,
        state: ContractState::parse(&state)
            .ok_or_else(|| RepoError::Database(format!("Unknown state '{state}'")))?,
        signature_state: SignatureState::parse(&signature_state).ok_or_else(|| {
            RepoError::Database(format!("Unknown signature_state '{signature_state}'"))
        })?,
        start_date: start_date
            .parse()
            .map_err(|e| RepoError::Database(format!("Bad start_date: {e}")))?,
        end_date: end_date
            .map(|d| d.parse())
            .transpose()
            .map_err(|e| RepoError::Database(format!("Bad end_date: {e}")))?,
        total_amount: row.try_get("total_amount")?,
        meter_ref: row.try_get("meter_ref")?,
        subscription_ref: row.try_get("subscription_ref")?,
        version: row.try_get("version")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Insert a new contract row. Runs on any executor so contract and cosigner
/// inserts can share one transaction.
pub async fn insert<'e, E>(executor: E, c: &Contract) -> RepoResult<()>
where
    E: sqlx::SqliteExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO contract (id, tenant_id, owner_type, owner_id, business_number, zone, kind, \
         state, signature_state, start_date, end_date, total_amount, meter_ref, subscription_ref, \
         version, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&c.id)
    .bind(&c.tenant_id)
    .bind(c.owner.kind())
    .bind(c.owner.id())
    .bind(&c.business_number)
    .bind(&c.zone)
    .bind(c.kind.as_str())
    .bind(c.state.as_str())
    .bind(c.signature_state.as_str())
    .bind(c.start_date.to_string())
    .bind(c.end_date.map(|d| d.to_string()))
    .bind(c.total_amount)
    .bind(&c.meter_ref)
    .bind(&c.subscription_ref)
    .bind(c.version)
    .bind(c.created_at)
    .bind(c.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn find_by_id(pool: &SqlitePool, id: &str) -> RepoResult<Option<Contract>> {
    let row = sqlx::query(&format!("SELECT {COLUMNS} FROM contract WHERE id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(map_row).transpose()
}

/// Defensive uniqueness re-check before binding a freshly minted number
pub async fn business_number_exists(pool: &SqlitePool, number: &str) -> RepoResult<bool> {
    let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contract WHERE business_number = ?")
        .bind(number)
        .fetch_one(pool)
        .await?;
    Ok(n > 0)
}

fn guard(rows: u64, id: &str) -> RepoResult<()> {
    if rows == 0 {
        return Err(RepoError::VersionConflict(format!(
            "Contract {id} was modified concurrently"
        )));
    }
    Ok(())
}

/// Guarded state change
pub async fn set_state(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    state: ContractState,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET state = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(state.as_str())
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}

/// Finalize mutation: state plus the freshly minted business number
pub async fn finalize(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    business_number: &str,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET state = 'ACTIVE', business_number = ?, version = version + 1, \
         updated_at = ? WHERE id = ? AND version = ?",
    )
    .bind(business_number)
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}

/// Compensation for [`finalize`]: back to PENDING, number cleared only when
/// it was minted in the failed run
pub async fn revert_finalize(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    clear_number: bool,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let sql = if clear_number {
        "UPDATE contract SET state = 'PENDING', business_number = NULL, version = version + 1, \
         updated_at = ? WHERE id = ? AND version = ?"
    } else {
        "UPDATE contract SET state = 'PENDING', version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?"
    };
    let rows = sqlx::query(sql)
        .bind(now)
        .bind(id)
        .bind(version)
        .execute(pool)
        .await?
        .rows_affected();
    guard(rows, id)
}

pub async fn set_meter_ref(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    meter_ref: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET meter_ref = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(meter_ref)
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}

pub async fn set_subscription_ref(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    subscription_ref: Option<&str>,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET subscription_ref = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(subscription_ref)
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}

/// Renewal moves the supply end date
pub async fn set_end_date(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    end_date: NaiveDate,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET end_date = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(end_date.to_string())
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}

pub async fn set_signature_state(
    pool: &SqlitePool,
    id: &str,
    version: i64,
    state: SignatureState,
) -> RepoResult<()> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE contract SET signature_state = ?, version = version + 1, updated_at = ? \
         WHERE id = ? AND version = ?",
    )
    .bind(state.as_str())
    .bind(now)
    .bind(id)
    .bind(version)
    .execute(pool)
    .await?
    .rows_affected();
    guard(rows, id)
}
