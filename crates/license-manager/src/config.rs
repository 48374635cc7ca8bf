//! Runtime remote-target resolution.
//!
//! Three layers, resolved field by field (an empty field falls through):
//!
//! 1. The persisted override row in the local store
//! 2. The shared INI file
//! 3. The compiled-in defaults from [`Settings`](crate::settings::Settings)
//!
//! The resolved target is held as an immutable `Arc` snapshot and replaced
//! whole on [`RemoteConfigProvider::reload`], so a reader never observes a
//! half-updated target.

use std::sync::{Arc, RwLock};

use license_manager_core::RemoteTarget;
use license_manager_store::{LicenseStore, StoreError};

use crate::shared_config::SharedConfigFile;

/// Layer the three sources into one target.
pub fn resolve(
    defaults: &RemoteTarget,
    shared: Option<&RemoteTarget>,
    persisted: Option<&RemoteTarget>,
) -> RemoteTarget {
    let mut target = defaults.clone();
    if let Some(shared) = shared {
        target = target.overlay(shared);
    }
    if let Some(persisted) = persisted {
        target = target.overlay(persisted);
    }
    target
}

/// Holds the current remote target snapshot.
pub struct RemoteConfigProvider {
    defaults: RemoteTarget,
    shared: Option<SharedConfigFile>,
    current: RwLock<Arc<RemoteTarget>>,
}

impl RemoteConfigProvider {
    /// Start with the defaults as the current snapshot.
    pub fn new(defaults: RemoteTarget, shared: Option<SharedConfigFile>) -> Self {
        let current = RwLock::new(Arc::new(defaults.clone()));
        Self {
            defaults,
            shared,
            current,
        }
    }

    pub fn shared_file(&self) -> Option<&SharedConfigFile> {
        self.shared.as_ref()
    }

    /// The current snapshot.
    pub fn current(&self) -> Arc<RemoteTarget> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Re-read the shared file and the persisted row, and swap in the result.
    ///
    /// An unreadable shared file is logged and skipped. A store failure is
    /// returned and leaves the previous snapshot in place.
    pub async fn reload<L>(&self, store: &L) -> Result<Arc<RemoteTarget>, StoreError>
    where
        L: LicenseStore + ?Sized,
    {
        let shared = match self.read_shared().await {
            Ok(shared) => shared,
            Err(message) => {
                tracing::warn!(error = %message, "ignoring shared remote config");
                None
            }
        };
        let persisted = store.load_remote_config().await?;

        let resolved = Arc::new(resolve(
            &self.defaults,
            shared.as_ref(),
            persisted.as_ref().map(|p| &p.target),
        ));

        match self.current.write() {
            Ok(mut guard) => *guard = Arc::clone(&resolved),
            Err(poisoned) => *poisoned.into_inner() = Arc::clone(&resolved),
        }

        tracing::debug!(
            remote = ?resolved,
            from_shared = shared.is_some(),
            from_store = persisted.is_some(),
            "reloaded remote target"
        );
        Ok(resolved)
    }

    async fn read_shared(&self) -> Result<Option<RemoteTarget>, String> {
        let Some(file) = self.shared.clone() else {
            return Ok(None);
        };
        tokio::task::spawn_blocking(move || file.read())
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())
    }
}
