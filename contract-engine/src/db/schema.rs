//! Schema bootstrap
//!
//! Idempotent DDL executed at startup. The engine owns exactly four tables:
//! `contract`, `cosigner`, `sequence_counter` and `audit_entry`. Everything
//! else (clients, meters, subscriptions) lives in external registries.

use sqlx::SqlitePool;

const DDL: &[&str] = &[
    // Contracts are never deleted, only transitioned to a terminal state.
    // `version` backs the per-contract optimistic lock.
    r#"
    CREATE TABLE IF NOT EXISTS contract (
        id               TEXT PRIMARY KEY,
        tenant_id        TEXT NOT NULL,
        owner_type       TEXT NOT NULL,
        owner_id         TEXT NOT NULL,
        business_number  TEXT UNIQUE,
        zone             TEXT NOT NULL,
        kind             TEXT NOT NULL,
        state            TEXT NOT NULL,
        signature_state  TEXT NOT NULL,
        start_date       TEXT NOT NULL,
        end_date         TEXT,
        total_amount     REAL,
        meter_ref        TEXT,
        subscription_ref TEXT,
        version          INTEGER NOT NULL DEFAULT 1,
        created_at       INTEGER NOT NULL,
        updated_at       INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_contract_tenant ON contract(tenant_id)",
    "CREATE INDEX IF NOT EXISTS idx_contract_state ON contract(state)",
    r#"
    CREATE TABLE IF NOT EXISTS cosigner (
        id               TEXT PRIMARY KEY,
        contract_id      TEXT NOT NULL REFERENCES contract(id),
        party_type       TEXT NOT NULL,
        party_id         TEXT NOT NULL,
        role             TEXT NOT NULL,
        share_percentage REAL NOT NULL,
        invitation_state TEXT NOT NULL,
        signed           INTEGER NOT NULL DEFAULT 0,
        signed_at        INTEGER,
        created_at       INTEGER NOT NULL,
        updated_at       INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_cosigner_contract ON cosigner(contract_id)",
    // One row per (entity kind, partition, period); created lazily, value
    // never decremented or reused.
    r#"
    CREATE TABLE IF NOT EXISTS sequence_counter (
        entity_kind   TEXT NOT NULL,
        partition_key TEXT NOT NULL,
        period_key    TEXT NOT NULL,
        last_value    INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (entity_kind, partition_key, period_key)
    )
    "#,
    // Append-only; no UPDATE or DELETE path exists in the codebase.
    r#"
    CREATE TABLE IF NOT EXISTS audit_entry (
        sequence        INTEGER PRIMARY KEY,
        contract_id     TEXT NOT NULL,
        tenant_id       TEXT NOT NULL,
        actor_id        TEXT,
        action          TEXT NOT NULL,
        before_snapshot TEXT,
        after_snapshot  TEXT,
        occurred_at     INTEGER NOT NULL,
        prev_hash       TEXT NOT NULL,
        curr_hash       TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_audit_contract ON audit_entry(contract_id, occurred_at)",
];

/// Apply the schema; safe to call on every startup
pub async fn apply(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    for stmt in DDL {
        sqlx::query(stmt).execute(pool).await?;
    }
    Ok(())
}
