//! In-memory implementation of the LicenseStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;

use license_manager_core::{LicenseRecord, RemoteTarget};

use crate::error::{Result, StoreError};
use crate::traits::{LicenseStore, PersistedRemoteConfig};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Records in insertion order; `id` mirrors SQLite's rowid tiebreak.
    records: Vec<(u64, LicenseRecord)>,
    next_id: u64,
    config: Option<PersistedRemoteConfig>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))
    }
}

/// Newest first, ties broken by insertion order descending.
fn sort_recent(records: &mut [&(u64, LicenseRecord)]) {
    records.sort_by(|(a_id, a), (b_id, b)| {
        b.generated_at
            .cmp(&a.generated_at)
            .then_with(|| b_id.cmp(a_id))
    });
}

#[async_trait]
impl LicenseStore for MemoryStore {
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

        let mut inner = self.write()?;

        let primary = {
            let mut same: Vec<_> = inner
                .records
                .iter()
                .filter(|(_, r)| r.machine_id == stored.machine_id)
                .collect();
            sort_recent(&mut same);
            same.first().map(|(id, _)| *id)
        };

        // Mirror the UNIQUE constraint on license_key, before anything changes.
        if inner
            .records
            .iter()
            .any(|(_, r)| r.machine_id != stored.machine_id && r.license_key == stored.license_key)
        {
            return Err(StoreError::InvalidData(format!(
                "license key already stored for another machine: {}",
                stored.license_key
            )));
        }

        inner
            .records
            .retain(|(id, r)| r.machine_id != stored.machine_id || Some(*id) == primary);

        let slot = primary.and_then(|id| inner.records.iter().position(|(rid, _)| *rid == id));
        match slot {
            Some(i) => inner.records[i].1 = stored.clone(),
            None => {
                inner.next_id += 1;
                let id = inner.next_id;
                inner.records.push((id, stored.clone()));
            }
        }

        Ok(stored)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<LicenseRecord>> {
        let inner = self.read()?;
        let mut all: Vec<_> = inner.records.iter().collect();
        sort_recent(&mut all);
        Ok(all.into_iter().take(limit).map(|(_, r)| r.clone()).collect())
    }

    async fn get_by_machine(&self, machine_id: &str) -> Result<Option<LicenseRecord>> {
        let inner = self.read()?;
        let mut same: Vec<_> = inner
            .records
            .iter()
            .filter(|(_, r)| r.machine_id == machine_id)
            .collect();
        sort_recent(&mut same);
        Ok(same.first().map(|(_, r)| r.clone()))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.read()?.records.len())
    }

    async fn load_remote_config(&self) -> Result<Option<PersistedRemoteConfig>> {
        Ok(self.read()?.config.clone())
    }

    async fn save_remote_config(
        &self,
        target: &RemoteTarget,
        updated_by: &str,
    ) -> Result<PersistedRemoteConfig> {
        let mut inner = self.write()?;
        let now = Utc::now();
        let created_at = inner.config.as_ref().map_or(now, |c| c.created_at);

        let saved = PersistedRemoteConfig {
            target: target.clone(),
            updated_by: updated_by.to_string(),
            created_at,
            updated_at: now,
        };
        inner.config = Some(saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};
    use license_manager_core::{derive, DerivationPolicy, MachineId};

    fn at(min: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 13, 12, 0, 0).unwrap() + Duration::minutes(min)
    }

    fn issue(machine: &str, min: i64, note: &str) -> LicenseRecord {
        let machine = MachineId::parse(machine).unwrap();
        let derived = derive(&machine, at(min), &DerivationPolicy::new("ops@example.com"));
        LicenseRecord::issued(&machine, &derived).note(note)
    }

    #[tokio::test]
    async fn test_regenerate_overwrites_machine_row() {
        let store = MemoryStore::new();

        store.upsert_by_machine(&issue("DESKTOP-123", 0, "first")).await.unwrap();
        store.upsert_by_machine(&issue("DESKTOP-123", 15, "second")).await.unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        let loaded = store.get_by_machine("DESKTOP-123").await.unwrap().unwrap();
        assert_eq!(loaded.note, "second");
    }

    #[tokio::test]
    async fn test_list_recent_order_and_limit() {
        let store = MemoryStore::new();
        store.upsert_by_machine(&issue("ALPHA-1", 20, "")).await.unwrap();
        store.upsert_by_machine(&issue("BRAVO-2", 0, "")).await.unwrap();
        store.upsert_by_machine(&issue("CHARLIE-3", 10, "")).await.unwrap();

        let recent = store.list_recent(2).await.unwrap();
        let machines: Vec<_> = recent.iter().map(|r| r.machine_id.as_str()).collect();
        assert_eq!(machines, ["ALPHA-1", "CHARLIE-3"]);
    }

    #[tokio::test]
    async fn test_remote_config_keeps_created_at() {
        let store = MemoryStore::new();
        let first = store
            .save_remote_config(&RemoteTarget::new("mongodb://a", "db", "keys"), "admin")
            .await
            .unwrap();
        let second = store
            .save_remote_config(&RemoteTarget::new("mongodb://b", "db", "keys"), "admin")
            .await
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(
            store.load_remote_config().await.unwrap().unwrap().target.uri,
            "mongodb://b"
        );
    }
}
