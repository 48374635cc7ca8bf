//! Store traits: the abstract interfaces for license persistence.
//!
//! [`LicenseStore`] is the local, authoritative store. [`RemoteStore`] is the
//! best-effort replica. Implementations include SQLite (primary local),
//! in-memory (tests), and MongoDB (remote, behind the `mongo` feature).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use license_manager_core::{LicenseRecord, RemoteTarget};

use crate::error::{RemoteError, RemoteResult, Result};

/// The persisted remote-target override row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedRemoteConfig {
    pub target: RemoteTarget,
    /// Username of the operator who last saved it.
    pub updated_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The local store: async interface for license persistence.
///
/// All methods are async so SQLite work can run on the blocking pool.
///
/// # Design Notes
///
/// - **One row per machine**: [`LicenseStore::upsert_by_machine`] overwrites
///   the existing row for the machine and deletes any duplicates, atomically.
///   Callers never read-then-write.
/// - **Single config row**: [`LicenseStore::save_remote_config`] collapses the
///   override table to exactly one row.
#[async_trait]
pub trait LicenseStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // License Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert or overwrite the record for `record.machine_id`.
    ///
    /// The newest existing row for the machine is kept and rewritten with
    /// every field of `record`; all other rows for the machine are removed.
    /// `updated_at` is stamped with the current time, and a missing
    /// `generated_at` is filled with it.
    ///
    /// # Returns
    /// The record as stored.
    async fn upsert_by_machine(&self, record: &LicenseRecord) -> Result<LicenseRecord>;

    /// The `limit` most recently generated records, newest first.
    async fn list_recent(&self, limit: usize) -> Result<Vec<LicenseRecord>>;

    /// The record for a machine, if any.
    async fn get_by_machine(&self, machine_id: &str) -> Result<Option<LicenseRecord>>;

    /// Total number of stored records.
    async fn count(&self) -> Result<usize>;

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Config Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The persisted remote-target override, if one was ever saved.
    async fn load_remote_config(&self) -> Result<Option<PersistedRemoteConfig>>;

    /// Persist `target` as the single override row.
    async fn save_remote_config(
        &self,
        target: &RemoteTarget,
        updated_by: &str,
    ) -> Result<PersistedRemoteConfig>;
}

/// The remote replica: a document store keyed by machine id and license key.
///
/// Every call is told which target to use, so a config change takes effect on
/// the next call without rebuilding the store.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// The `limit` most recently generated documents, newest first.
    async fn fetch_recent(&self, target: &RemoteTarget, limit: usize) -> RemoteResult<Vec<LicenseRecord>>;

    /// Upsert the document for `record.machine_id`, then delete any other
    /// documents for that machine holding a different key.
    async fn upsert_by_machine(&self, target: &RemoteTarget, record: &LicenseRecord) -> RemoteResult<()>;
}

/// A remote store for builds without a driver.
///
/// Every call fails with [`RemoteError::DriverUnavailable`] (or
/// [`RemoteError::NotConfigured`] when the target has no URI).
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableRemote;

#[async_trait]
impl RemoteStore for UnavailableRemote {
    async fn fetch_recent(&self, target: &RemoteTarget, _limit: usize) -> RemoteResult<Vec<LicenseRecord>> {
        if !target.is_configured() {
            return Err(RemoteError::NotConfigured);
        }
        Err(RemoteError::DriverUnavailable)
    }

    async fn upsert_by_machine(&self, target: &RemoteTarget, _record: &LicenseRecord) -> RemoteResult<()> {
        if !target.is_configured() {
            return Err(RemoteError::NotConfigured);
        }
        Err(RemoteError::DriverUnavailable)
    }
}

#[async_trait]
impl<S: LicenseStore + ?Sized> LicenseStore for std::sync::Arc<S> {
    async fn upsert_by_machine(&self, record: &LicenseRecord) -> Result<LicenseRecord> {
        (**self).upsert_by_machine(record).await
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<LicenseRecord>> {
        (**self).list_recent(limit).await
    }

    async fn get_by_machine(&self, machine_id: &str) -> Result<Option<LicenseRecord>> {
        (**self).get_by_machine(machine_id).await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }

    async fn load_remote_config(&self) -> Result<Option<PersistedRemoteConfig>> {
        (**self).load_remote_config().await
    }

    async fn save_remote_config(
        &self,
        target: &RemoteTarget,
        updated_by: &str,
    ) -> Result<PersistedRemoteConfig> {
        (**self).save_remote_config(target, updated_by).await
    }
}

#[async_trait]
impl<R: RemoteStore + ?Sized> RemoteStore for std::sync::Arc<R> {
    async fn fetch_recent(&self, target: &RemoteTarget, limit: usize) -> RemoteResult<Vec<LicenseRecord>> {
        (**self).fetch_recent(target, limit).await
    }

    async fn upsert_by_machine(&self, target: &RemoteTarget, record: &LicenseRecord) -> RemoteResult<()> {
        (**self).upsert_by_machine(target, record).await
    }
}
