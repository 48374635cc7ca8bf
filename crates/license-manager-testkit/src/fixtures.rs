//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use license_manager::{
    IssueOutcome, IssueRequest, LicenseManager, Operator, Result, Settings,
};
use license_manager_core::{DerivationPolicy, LicenseRecord, LicenseStatus, RemoteTarget};
use license_manager_store::{MemoryRemoteStore, MemoryStore};

/// Seed email used by fixtures.
pub const FIXTURE_EMAIL: &str = "ops@example.com";

/// Remote URI the fixture replica is configured with.
pub const FIXTURE_URI: &str = "mongodb://fixture.invalid:27017";

/// The manager type the fixture drives.
pub type FixtureManager = LicenseManager<Arc<MemoryStore>, Arc<MemoryRemoteStore>>;

/// A manager over in-memory local and remote stores.
///
/// The stores are shared with the manager, so tests can inspect or seed
/// them directly.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub remote: Arc<MemoryRemoteStore>,
    pub manager: FixtureManager,
}

impl TestFixture {
    /// Create a fixture with [`fixture_settings`].
    pub async fn new() -> Result<Self> {
        Self::with_settings(fixture_settings()).await
    }

    /// Create a fixture with custom settings.
    pub async fn with_settings(settings: Settings) -> Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let remote = Arc::new(MemoryRemoteStore::new());
        let manager =
            LicenseManager::new(settings, Arc::clone(&store), Arc::clone(&remote)).await?;
        Ok(Self {
            store,
            remote,
            manager,
        })
    }

    /// Issue a key for `machine_id` at `at` as a cashier.
    pub async fn issue(&self, machine_id: &str, at: DateTime<Utc>) -> Result<IssueOutcome> {
        self.manager
            .issue(&IssueRequest::new(machine_id), &Operator::cashier("cashier"), at)
            .await
    }

    /// The remote target currently in effect.
    pub fn remote_target(&self) -> Arc<RemoteTarget> {
        self.manager.remote_target()
    }

    /// Documents in the current remote collection.
    pub fn remote_documents(&self) -> Vec<LicenseRecord> {
        self.remote
            .documents(&self.remote_target())
            .unwrap_or_default()
    }

    /// Put a record straight into the current remote collection.
    pub fn seed_remote(&self, record: LicenseRecord) {
        self.remote
            .insert_raw(&self.remote_target(), record)
            .expect("seed remote document");
    }
}

/// Settings with a configured remote, a short timeout, and no shared file.
pub fn fixture_settings() -> Settings {
    Settings {
        policy: DerivationPolicy::new(FIXTURE_EMAIL),
        default_target: RemoteTarget::new(FIXTURE_URI, "mahilmart_pos", "license_keys"),
        remote_timeout: Duration::from_secs(1),
        shared_config_path: None,
        ..Settings::default()
    }
}

/// 2026-02-13 at `hour:minute` UTC.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 13, hour, minute, 0)
        .single()
        .expect("valid fixture time")
}

/// A bare record as another writer might have stored it.
pub fn record(machine_id: &str, license_key: &str, generated_at: DateTime<Utc>) -> LicenseRecord {
    LicenseRecord {
        machine_id: machine_id.to_string(),
        license_key: license_key.to_string(),
        customer_name: String::new(),
        contact_email: String::new(),
        note: String::new(),
        generated_by: String::new(),
        status: LicenseStatus::Valid,
        source: String::new(),
        generated_at: Some(generated_at),
        valid_until: None,
        updated_at: Some(generated_at),
    }
}
