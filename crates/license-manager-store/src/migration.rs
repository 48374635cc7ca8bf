//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL string
//! that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
        [],
        |row| row.get(0),
    )?;

    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, chrono::Utc::now().timestamp_millis()],
            )?;
            tracing::debug!(version, "applied schema migration");
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- One row per machine after every upsert; timestamps are Unix ms
        CREATE TABLE licenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            machine_id TEXT NOT NULL,
            license_key TEXT NOT NULL UNIQUE,
            customer_name TEXT NOT NULL DEFAULT '',
            contact_email TEXT NOT NULL DEFAULT '',
            note TEXT NOT NULL DEFAULT '',
            generated_by TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'generated',
            source TEXT NOT NULL DEFAULT '',
            generated_at INTEGER NOT NULL,
            valid_until INTEGER,
            updated_at INTEGER NOT NULL
        );

        -- Remote-target override; at most one row
        CREATE TABLE runtime_config (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            mongo_uri TEXT NOT NULL DEFAULT '',
            mongo_db TEXT NOT NULL DEFAULT '',
            mongo_collection TEXT NOT NULL DEFAULT '',
            updated_by TEXT NOT NULL DEFAULT '',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE INDEX idx_licenses_machine ON licenses(machine_id);
        CREATE INDEX idx_licenses_generated ON licenses(generated_at);
        CREATE INDEX idx_licenses_valid_until ON licenses(valid_until);
        "#,
    )?;

    Ok(())
}
