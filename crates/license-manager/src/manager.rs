//! The LicenseManager: issuance, dashboard, and remote settings.
//!
//! Brings together derivation, the local store, the remote replica, and the
//! runtime remote target.
//!
//! Issue: normalize → derive → local upsert → best-effort remote push.
//! Read: local list + remote fetch → merge → annotate → summarize.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};

use license_manager_core::{
    derive, merge, summarize, DashboardStats, LicenseRecord, MachineId, RemoteTarget,
    DEFAULT_MERGE_LIMIT,
};
use license_manager_store::{
    LicenseStore, RemoteError, RemoteResult, RemoteStore, SqliteStore,
};

use crate::config::RemoteConfigProvider;
use crate::error::{ManagerError, Result};
use crate::operator::Operator;
use crate::settings::Settings;
use crate::shared_config::SharedConfigFile;

/// The remote store used by [`LicenseManager::open`].
#[cfg(feature = "mongo")]
pub type DefaultRemote = license_manager_store::MongoRemoteStore;

/// The remote store used by [`LicenseManager::open`].
#[cfg(not(feature = "mongo"))]
pub type DefaultRemote = license_manager_store::UnavailableRemote;

#[cfg(feature = "mongo")]
fn default_remote(settings: &Settings) -> DefaultRemote {
    license_manager_store::MongoRemoteStore::new(settings.policy.license_email.clone())
}

#[cfg(not(feature = "mongo"))]
fn default_remote(_settings: &Settings) -> DefaultRemote {
    license_manager_store::UnavailableRemote
}

/// Input to [`LicenseManager::issue`]: raw form values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueRequest {
    pub machine_id: String,
    pub customer_name: String,
    pub contact_email: String,
    pub note: String,
}

impl IssueRequest {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            ..Self::default()
        }
    }

    pub fn customer_name(mut self, name: impl Into<String>) -> Self {
        self.customer_name = name.into();
        self
    }

    pub fn contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = email.into();
        self
    }

    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}

/// Result of a successful issuance.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
    /// The record as stored locally.
    pub record: LicenseRecord,
    pub validity_minutes: u32,
    /// Why the remote push did not happen, if it did not.
    pub remote_warning: Option<RemoteError>,
}

impl IssueOutcome {
    pub fn license_key(&self) -> &str {
        &self.record.license_key
    }

    pub fn synced(&self) -> bool {
        self.remote_warning.is_none()
    }

    /// Operator-facing confirmation, with the expiry shown in `tz`.
    pub fn message<Tz>(&self, tz: &Tz) -> String
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let until = self
            .record
            .valid_until
            .map(|at| at.with_timezone(tz).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        format!(
            "License generated: {} (valid for {} minutes, until {}).",
            self.record.license_key, self.validity_minutes, until
        )
    }
}

/// The reconciled read view.
#[derive(Debug, Clone)]
pub struct Dashboard {
    /// Merged, deduplicated, status-annotated records, newest first.
    pub records: Vec<LicenseRecord>,
    pub stats: DashboardStats,
    pub license_email: String,
    /// The remote target the view was read against.
    pub remote_target: Arc<RemoteTarget>,
    /// Why remote records are missing, if they are.
    pub remote_warning: Option<RemoteError>,
}

/// Result of saving remote settings.
#[derive(Debug, Clone)]
pub struct SettingsOutcome {
    /// The target now in effect, after reload.
    pub target: Arc<RemoteTarget>,
    /// Set when the shared file could not be updated.
    pub shared_file_warning: Option<String>,
}

/// The License Manager service.
pub struct LicenseManager<L, R> {
    settings: Settings,
    store: L,
    remote: R,
    remote_config: RemoteConfigProvider,
}

impl LicenseManager<SqliteStore, DefaultRemote> {
    /// Open the SQLite database named in `settings` with the default remote.
    pub async fn open(settings: Settings) -> Result<Self> {
        let store = SqliteStore::open(&settings.database_path)?;
        let remote = default_remote(&settings);
        Self::new(settings, store, remote).await
    }
}

impl<L: LicenseStore, R: RemoteStore> LicenseManager<L, R> {
    /// Create a manager and load the initial remote target.
    pub async fn new(settings: Settings, store: L, remote: R) -> Result<Self> {
        let shared = settings
            .shared_config_path
            .as_ref()
            .map(SharedConfigFile::new);
        let remote_config = RemoteConfigProvider::new(settings.default_target.clone(), shared);
        remote_config.reload(&store).await?;

        Ok(Self {
            settings,
            store,
            remote,
            remote_config,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &L {
        &self.store
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// The remote target currently in effect.
    pub fn remote_target(&self) -> Arc<RemoteTarget> {
        self.remote_config.current()
    }

    /// Re-read the shared file and persisted override.
    pub async fn reload_remote_config(&self) -> Result<Arc<RemoteTarget>> {
        Ok(self.remote_config.reload(&self.store).await?)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Issuance
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue a key for `request.machine_id` at `now`.
    ///
    /// Fails only on a rejected machine id or a local store error. A remote
    /// failure is returned in [`IssueOutcome::remote_warning`].
    pub async fn issue(
        &self,
        request: &IssueRequest,
        operator: &Operator,
        now: DateTime<Utc>,
    ) -> Result<IssueOutcome> {
        let machine_id = MachineId::parse(&request.machine_id)?;
        let derived = derive(&machine_id, now, &self.settings.policy);

        let record = LicenseRecord::issued(&machine_id, &derived)
            .customer_name(&request.customer_name)
            .contact_email(&request.contact_email)
            .note(&request.note)
            .generated_by(&operator.username)
            .source(&self.settings.source);

        let stored = self.store.upsert_by_machine(&record).await?;

        let target = self.remote_config.current();
        let remote_warning = self
            .bounded(self.remote.upsert_by_machine(&target, &stored))
            .await
            .err();
        if let Some(err) = &remote_warning {
            tracing::warn!(machine_id = %machine_id, error = %err, "remote sync skipped");
        }

        tracing::info!(
            machine_id = %machine_id,
            operator = %operator.username,
            synced = remote_warning.is_none(),
            "issued license"
        );

        Ok(IssueOutcome {
            record: stored,
            validity_minutes: self.settings.policy.validity.minutes(),
            remote_warning,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dashboard
    // ─────────────────────────────────────────────────────────────────────────

    /// The reconciled recent-license view at `now`.
    ///
    /// "Today" in the statistics is the calendar day of `now` in its own
    /// time zone.
    pub async fn dashboard<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Result<Dashboard> {
        let local = self.store.list_recent(DEFAULT_MERGE_LIMIT).await?;

        let target = self.remote_config.current();
        let (remote, remote_warning) = match self
            .bounded(self.remote.fetch_recent(&target, DEFAULT_MERGE_LIMIT))
            .await
        {
            Ok(records) => (records, None),
            // An unset URI means the replica is off, not failing.
            Err(RemoteError::NotConfigured) => (Vec::new(), None),
            Err(err) => {
                tracing::warn!(error = %err, "remote fetch failed, showing local records only");
                (Vec::new(), Some(err))
            }
        };

        let records = merge(
            local,
            remote,
            DEFAULT_MERGE_LIMIT,
            now.with_timezone(&Utc),
            self.settings.policy.validity,
        );
        let stats = summarize(&records, now);

        Ok(Dashboard {
            records,
            stats,
            license_email: self.settings.policy.license_email.clone(),
            remote_target: target,
            remote_warning,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote Settings
    // ─────────────────────────────────────────────────────────────────────────

    /// Persist a new remote target and make it current.
    ///
    /// Admin only. Database and collection are required; an empty URI is
    /// allowed and falls through to lower layers. The shared file is updated
    /// too, but a failure there is only a warning.
    pub async fn save_remote_settings(
        &self,
        operator: &Operator,
        target: &RemoteTarget,
    ) -> Result<SettingsOutcome> {
        if !operator.role.can_manage_remote_settings() {
            return Err(ManagerError::NotAuthorized(
                "Only admin can change MongoDB settings.".into(),
            ));
        }

        let target = RemoteTarget::new(
            target.uri.as_str(),
            target.database.as_str(),
            target.collection.as_str(),
        );
        if target.database.is_empty() || target.collection.is_empty() {
            return Err(ManagerError::InvalidSettings(
                "Mongo DB and Collection are required.".into(),
            ));
        }

        self.store
            .save_remote_config(&target, &operator.username)
            .await?;

        let shared_file_warning = match self.remote_config.shared_file() {
            Some(file) => {
                let file = file.clone();
                let written = target.clone();
                let result = tokio::task::spawn_blocking(move || file.write(&written))
                    .await
                    .map_err(|e| e.to_string())
                    .and_then(|r| r.map_err(|e| e.to_string()));
                result
                    .err()
                    .map(|e| format!("Could not update POS shared Mongo config: {e}"))
            }
            None => Some(
                "Could not update POS shared Mongo config: no config location available".into(),
            ),
        };
        if let Some(warning) = &shared_file_warning {
            tracing::warn!(%warning, "shared remote config not updated");
        }

        let current = self.remote_config.reload(&self.store).await?;
        tracing::info!(operator = %operator.username, remote = ?current, "saved remote settings");

        Ok(SettingsOutcome {
            target: current,
            shared_file_warning,
        })
    }

    /// Run a remote call under the configured timeout.
    async fn bounded<T>(&self, call: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
        let limit = self.settings.remote_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or(Err(RemoteError::Timeout(limit)))
    }
}
