//! Database schema migrations for SQLite.
//!
//! Each migration is a SQL batch taking the schema from version N to N+1.
//! Applied versions are recorded in `schema_migrations`.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 2;

/// Initialize or migrate the database schema.
///
/// Idempotent.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current > CURRENT_VERSION {
        return Err(StoreError::Migration(format!(
            "database schema version {current} is newer than supported version {CURRENT_VERSION}"
        )));
    }

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().to_rfc3339()],
            )?;
        }

        tx.commit()?;
        tracing::info!(from = current, to = CURRENT_VERSION, "migrated notary schema");
    }

    Ok(())
}

fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        2 => apply_v2(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: accounts, notarizations and in-flight claims.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE accounts (
            address TEXT PRIMARY KEY,          -- "N" + 40 hex chars
            public_key TEXT NOT NULL,          -- 128 hex chars: signing || exchange
            nonce TEXT NOT NULL,               -- 64 hex chars, current challenge
            confirmed INTEGER NOT NULL DEFAULT 0,
            email TEXT
        );

        CREATE TABLE notarizations (
            document_hash TEXT PRIMARY KEY,    -- 64 lowercase hex chars
            notary_hash TEXT NOT NULL,
            address TEXT NOT NULL,
            transaction_reference TEXT NOT NULL,
            created_at TEXT NOT NULL           -- RFC 3339, microseconds, UTC
        );

        -- Document hashes whose ledger submission is in flight or orphaned
        CREATE TABLE notarization_claims (
            document_hash TEXT PRIMARY KEY,
            address TEXT NOT NULL,
            claimed_at TEXT NOT NULL
        );

        CREATE INDEX idx_notarizations_address ON notarizations(address);
        CREATE INDEX idx_claims_claimed_at ON notarization_claims(claimed_at);
        "#,
    )?;

    Ok(())
}

/// Migration v2: confirmation codes kept apart from the challenge nonce.
///
/// Accounts still unconfirmed keep the code they were registered with, which
/// v1 stored as the nonce.
fn apply_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        ALTER TABLE accounts ADD COLUMN confirmation TEXT;  -- 64 hex chars, NULL once used

        UPDATE accounts SET confirmation = nonce WHERE confirmed = 0;
        "#,
    )?;

    Ok(())
}
