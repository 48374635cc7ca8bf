//! In-memory remote replica.
//!
//! Stands in for the document store in tests. Documents are grouped by
//! `(database, collection)` so a target switch is observable, and the store
//! can be taken offline to exercise degraded paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use license_manager_core::{LicenseRecord, RemoteTarget};

use crate::error::{RemoteError, RemoteResult};
use crate::traits::RemoteStore;

type Namespace = (String, String);

/// In-memory [`RemoteStore`].
#[derive(Default)]
pub struct MemoryRemoteStore {
    collections: RwLock<HashMap<Namespace, Vec<LicenseRecord>>>,
    offline: AtomicBool,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail as if the server were unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Seed a document directly, bypassing upsert semantics.
    pub fn insert_raw(&self, target: &RemoteTarget, record: LicenseRecord) -> RemoteResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        collections.entry(namespace(target)).or_default().push(record);
        Ok(())
    }

    /// All documents in the target's collection, in insertion order.
    pub fn documents(&self, target: &RemoteTarget) -> RemoteResult<Vec<LicenseRecord>> {
        let collections = self
            .collections
            .read()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        Ok(collections.get(&namespace(target)).cloned().unwrap_or_default())
    }

    fn check(&self, target: &RemoteTarget) -> RemoteResult<()> {
        if !target.is_configured() {
            return Err(RemoteError::NotConfigured);
        }
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Backend("server selection timed out".into()));
        }
        Ok(())
    }
}

fn namespace(target: &RemoteTarget) -> Namespace {
    (target.database.clone(), target.collection.clone())
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch_recent(&self, target: &RemoteTarget, limit: usize) -> RemoteResult<Vec<LicenseRecord>> {
        self.check(target)?;
        let mut docs = self.documents(target)?;
        docs.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        docs.truncate(limit.max(1));
        Ok(docs)
    }

    async fn upsert_by_machine(&self, target: &RemoteTarget, record: &LicenseRecord) -> RemoteResult<()> {
        self.check(target)?;
        let mut collections = self
            .collections
            .write()
            .map_err(|e| RemoteError::Backend(e.to_string()))?;
        let docs = collections.entry(namespace(target)).or_default();

        match docs.iter().position(|d| d.machine_id == record.machine_id) {
            Some(i) => docs[i] = record.clone(),
            None => docs.push(record.clone()),
        }
        docs.retain(|d| d.machine_id != record.machine_id || d.license_key == record.license_key);

        tracing::debug!(machine_id = %record.machine_id, "upserted remote license");
        Ok(())
    }
}
