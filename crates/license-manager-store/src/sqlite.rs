//! SQLite implementation of the LicenseStore trait.
//!
//! This is the authoritative local store. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use license_manager_core::{LicenseRecord, LicenseStatus, RemoteTarget};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{LicenseStore, PersistedRemoteConfig};

const RECORD_COLUMNS: &str = "machine_id, license_key, customer_name, contact_email, note,
     generated_by, status, source, generated_at, valid_until, updated_at";

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        tracing::debug!(path = %path.display(), "opened license database");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn to_millis(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}

fn from_millis(ms: i64) -> rusqlite::Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single().ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(0, ms)
    })
}

// Helper to convert a row to LicenseRecord
fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<LicenseRecord> {
    let status: String = row.get("status")?;
    let valid_until: Option<i64> = row.get("valid_until")?;

    Ok(LicenseRecord {
        machine_id: row.get("machine_id")?,
        license_key: row.get("license_key")?,
        customer_name: row.get("customer_name")?,
        contact_email: row.get("contact_email")?,
        note: row.get("note")?,
        generated_by: row.get("generated_by")?,
        status: status.parse().unwrap_or(LicenseStatus::Generated),
        source: row.get("source")?,
        generated_at: Some(from_millis(row.get("generated_at")?)?),
        valid_until: valid_until.map(from_millis).transpose()?,
        updated_at: Some(from_millis(row.get("updated_at")?)?),
    })
}

fn row_to_config(row: &rusqlite::Row<'_>) -> rusqlite::Result<PersistedRemoteConfig> {
    Ok(PersistedRemoteConfig {
        target: RemoteTarget::new(
            row.get::<_, String>("mongo_uri")?,
            row.get::<_, String>("mongo_db")?,
            row.get::<_, String>("mongo_collection")?,
        ),
        updated_by: row.get("updated_by")?,
        created_at: from_millis(row.get("created_at")?)?,
        updated_at: from_millis(row.get("updated_at")?)?,
    })
}

#[async_trait]
impl LicenseStore for SqliteStore {
    async fn upsert_by_machine(&self, record: &LicenseRecord) -> Result<LicenseRecord> {
        if record.machine_id.trim().is_empty() {
            return Err(StoreError::InvalidData("machine_id is empty".into()));
        }

        let mut stored = record.clone();
        let now = Utc::now();
        stored.updated_at = Some(now);
        if stored.generated_at.is_none() {
            stored.generated_at = Some(now);
        }

        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let primary: Option<i64> = tx
                .query_row(
                    "SELECT id FROM licenses WHERE machine_id = ?1
                     ORDER BY generated_at DESC, id DESC LIMIT 1",
                    params![&stored.machine_id],
                    |row| row.get(0),
                )
                .optional()?;

            // Duplicates go first so the key's UNIQUE constraint sees only
            // the row being rewritten.
            let removed = tx.execute(
                "DELETE FROM licenses WHERE machine_id = ?1 AND id != ?2",
                params![&stored.machine_id, primary.unwrap_or(-1)],
            )?;

            let generated_at = stored.generated_at.map(to_millis).unwrap_or_default();
            let valid_until = stored.valid_until.map(to_millis);
            let updated_at = to_millis(now);

            match primary {
                Some(id) => {
                    tx.execute(
                        "UPDATE licenses SET
                            license_key = ?2, customer_name = ?3, contact_email = ?4,
                            note = ?5, generated_by = ?6, status = ?7, source = ?8,
                            generated_at = ?9, valid_until = ?10, updated_at = ?11
                         WHERE id = ?1",
                        params![
                            id,
                            &stored.license_key,
                            &stored.customer_name,
                            &stored.contact_email,
                            &stored.note,
                            &stored.generated_by,
                            stored.status.as_str(),
                            &stored.source,
                            generated_at,
                            valid_until,
                            updated_at,
                        ],
                    )?;
                }
                None => {
                    tx.execute(
                        &format!(
                            "INSERT INTO licenses ({RECORD_COLUMNS})
                             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
                        ),
                        params![
                            &stored.machine_id,
                            &stored.license_key,
                            &stored.customer_name,
                            &stored.contact_email,
                            &stored.note,
                            &stored.generated_by,
                            stored.status.as_str(),
                            &stored.source,
                            generated_at,
                            valid_until,
                            updated_at,
                        ],
                    )?;
                }
            }

            tx.commit()?;

            tracing::debug!(
                machine_id = %stored.machine_id,
                replaced = primary.is_some(),
                duplicates_removed = removed,
                "upserted license"
            );
            Ok(stored)
        })
        .await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<LicenseRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {RECORD_COLUMNS} FROM licenses
                 ORDER BY generated_at DESC, id DESC LIMIT ?1"
            ))?;

            let records = stmt
                .query_map(params![limit], row_to_record)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(records)
        })
        .await
    }

    async fn get_by_machine(&self, machine_id: &str) -> Result<Option<LicenseRecord>> {
        let machine_id = machine_id.to_string();

        self.blocking(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {RECORD_COLUMNS} FROM licenses WHERE machine_id = ?1
                     ORDER BY generated_at DESC, id DESC LIMIT 1"
                ),
                params![machine_id],
                row_to_record,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(|conn| {
            let n: i64 = conn.query_row("SELECT COUNT(*) FROM licenses", [], |row| row.get(0))?;
            usize::try_from(n).map_err(|_| StoreError::InvalidData(format!("negative count: {n}")))
        })
        .await
    }

    async fn load_remote_config(&self) -> Result<Option<PersistedRemoteConfig>> {
        self.blocking(|conn| {
            conn.query_row(
                "SELECT mongo_uri, mongo_db, mongo_collection, updated_by, created_at, updated_at
                 FROM runtime_config ORDER BY id LIMIT 1",
                [],
                row_to_config,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn save_remote_config(
        &self,
        target: &RemoteTarget,
        updated_by: &str,
    ) -> Result<PersistedRemoteConfig> {
        let target = target.clone();
        let updated_by = updated_by.to_string();

        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let now = to_millis(Utc::now());

            let existing: Option<(i64, i64)> = tx
                .query_row(
                    "SELECT id, created_at FROM runtime_config ORDER BY id LIMIT 1",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            match existing {
                Some((id, _)) => {
                    tx.execute(
                        "UPDATE runtime_config SET
                            mongo_uri = ?2, mongo_db = ?3, mongo_collection = ?4,
                            updated_by = ?5, updated_at = ?6
                         WHERE id = ?1",
                        params![
                            id,
                            &target.uri,
                            &target.database,
                            &target.collection,
                            &updated_by,
                            now,
                        ],
                    )?;
                    tx.execute("DELETE FROM runtime_config WHERE id != ?1", params![id])?;
                }
                None => {
                    tx.execute(
                        "INSERT INTO runtime_config
                            (mongo_uri, mongo_db, mongo_collection, updated_by, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                        params![
                            &target.uri,
                            &target.database,
                            &target.collection,
                            &updated_by,
                            now,
                        ],
                    )?;
                }
            }

            tx.commit()?;

            let created_at = existing.map(|(_, created)| created).unwrap_or(now);
            Ok(PersistedRemoteConfig {
                target,
                updated_by,
                created_at: from_millis(created_at)?,
                updated_at: from_millis(now)?,
            })
        })
        .await
    }
}
