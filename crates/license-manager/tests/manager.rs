//! End-to-end behavior of the LicenseManager over in-memory stores.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use license_manager::store::{
    LicenseStore, MemoryRemoteStore, MemoryStore, RemoteError, RemoteResult, RemoteStore,
};
use license_manager::{
    DerivationPolicy, IssueRequest, LicenseManager, LicenseRecord, LicenseStatus, ManagerError,
    Operator, RemoteTarget, Role, Settings, ValidationError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 13, 12, 0, 0).unwrap()
}

fn target() -> RemoteTarget {
    RemoteTarget::new("mongodb://localhost:27017", "mahilmart_pos", "license_keys")
}

fn settings_with_remote() -> Settings {
    Settings {
        policy: DerivationPolicy::new("ops@example.com"),
        default_target: target(),
        ..Settings::default()
    }
}

type Manager = LicenseManager<Arc<MemoryStore>, Arc<MemoryRemoteStore>>;

async fn manager(settings: Settings) -> anyhow::Result<(Manager, Arc<MemoryStore>, Arc<MemoryRemoteStore>)> {
    let store = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryRemoteStore::new());
    let manager = LicenseManager::new(settings, store.clone(), remote.clone()).await?;
    Ok((manager, store, remote))
}

// ─────────────────────────────────────────────────────────────────────────────
// Issuance
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn issue_persists_locally_and_remotely() -> anyhow::Result<()> {
    init_tracing();
    let (manager, store, remote) = manager(settings_with_remote()).await?;

    let request = IssueRequest::new("desktop-123")
        .customer_name("  Alice  ")
        .contact_email(" ALICE@Example.COM ")
        .note(" first generation ");
    let outcome = manager.issue(&request, &Operator::admin("admin"), noon()).await?;

    assert!(outcome.synced());
    assert_eq!(outcome.license_key(), "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");
    assert_eq!(outcome.validity_minutes, 10);
    assert_eq!(
        outcome.message(&Utc),
        "License generated: Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7 (valid for 10 minutes, until 2026-02-13 12:10:00)."
    );

    let local = store.get_by_machine("DESKTOP-123").await?.expect("stored");
    assert_eq!(local.customer_name, "Alice");
    assert_eq!(local.contact_email, "alice@example.com");
    assert_eq!(local.note, "first generation");
    assert_eq!(local.generated_by, "admin");
    assert_eq!(local.status, LicenseStatus::Valid);
    assert_eq!(local.valid_until, Some(noon() + Duration::minutes(10)));

    let docs = remote.documents(&target())?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].license_key, local.license_key);
    Ok(())
}

#[tokio::test]
async fn regenerating_overwrites_machine_row() -> anyhow::Result<()> {
    let (manager, store, remote) = manager(settings_with_remote()).await?;
    let operator = Operator::cashier("till_1");

    manager
        .issue(&IssueRequest::new("DESKTOP-123").note("first generation"), &operator, noon())
        .await?;
    let second = manager
        .issue(
            &IssueRequest::new("DESKTOP-123").note("second generation"),
            &operator,
            noon() + Duration::minutes(15),
        )
        .await?;

    assert_eq!(store.count().await?, 1);
    let row = store.get_by_machine("DESKTOP-123").await?.expect("stored");
    assert_eq!(row.note, "second generation");
    assert_eq!(row.license_key, second.record.license_key);

    // The replica dropped the superseded key as well.
    let docs = remote.documents(&target())?;
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].license_key, second.record.license_key);
    Ok(())
}

#[tokio::test]
async fn invalid_machine_ids_write_nothing() -> anyhow::Result<()> {
    let (manager, store, _) = manager(settings_with_remote()).await?;
    let operator = Operator::cashier("till_1");

    let err = manager
        .issue(&IssueRequest::new("ab"), &operator, noon())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Validation(ValidationError::InvalidMachineId(_))
    ));
    assert_eq!(
        err.to_string(),
        "Enter valid Machine ID (3-64 chars: letters, numbers, dot, underscore, hyphen)."
    );

    let err = manager
        .issue(
            &IssueRequest::new("pos-1234abcd-12ab-34cd-56ef-1234567890ab"),
            &operator,
            noon(),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ManagerError::Validation(ValidationError::BrowserStyleMachineId(_))
    ));

    assert_eq!(store.count().await?, 0);
    Ok(())
}

#[tokio::test]
async fn unconfigured_remote_is_a_warning() -> anyhow::Result<()> {
    let settings = Settings {
        policy: DerivationPolicy::new("ops@example.com"),
        ..Settings::default()
    };
    let (manager, store, _) = manager(settings).await?;

    let outcome = manager
        .issue(&IssueRequest::new("DESKTOP-123"), &Operator::cashier("till"), noon())
        .await?;

    assert_eq!(outcome.remote_warning, Some(RemoteError::NotConfigured));
    assert_eq!(store.count().await?, 1);

    // Reading with the replica off is not a degraded state.
    let dashboard = manager.dashboard(&noon()).await?;
    assert!(dashboard.remote_warning.is_none());
    assert_eq!(dashboard.records.len(), 1);
    Ok(())
}

#[tokio::test]
async fn offline_remote_degrades_to_local() -> anyhow::Result<()> {
    init_tracing();
    let (manager, store, remote) = manager(settings_with_remote()).await?;
    remote.set_offline(true);

    let outcome = manager
        .issue(&IssueRequest::new("DESKTOP-123"), &Operator::cashier("till"), noon())
        .await?;
    assert!(matches!(outcome.remote_warning, Some(RemoteError::Backend(_))));
    assert_eq!(store.count().await?, 1);

    let dashboard = manager.dashboard(&noon()).await?;
    assert!(matches!(dashboard.remote_warning, Some(RemoteError::Backend(_))));
    assert_eq!(dashboard.records.len(), 1);
    Ok(())
}

/// A replica that never answers.
struct HangingRemote;

#[async_trait]
impl RemoteStore for HangingRemote {
    async fn fetch_recent(&self, _: &RemoteTarget, _: usize) -> RemoteResult<Vec<LicenseRecord>> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    async fn upsert_by_machine(&self, _: &RemoteTarget, _: &LicenseRecord) -> RemoteResult<()> {
        tokio::time::sleep(StdDuration::from_secs(3600)).await;
        Ok(())
    }
}

#[tokio::test]
async fn slow_remote_times_out() -> anyhow::Result<()> {
    let settings = Settings {
        remote_timeout: StdDuration::from_millis(50),
        ..settings_with_remote()
    };
    let manager = LicenseManager::new(settings, MemoryStore::new(), HangingRemote).await?;

    let outcome = manager
        .issue(&IssueRequest::new("DESKTOP-123"), &Operator::cashier("till"), noon())
        .await?;
    assert_eq!(
        outcome.remote_warning,
        Some(RemoteError::Timeout(StdDuration::from_millis(50)))
    );
    assert!(outcome
        .remote_warning
        .as_ref()
        .is_some_and(|e| e.to_string().ends_with("after 50ms")));

    let dashboard = manager.dashboard(&noon()).await?;
    assert!(matches!(dashboard.remote_warning, Some(RemoteError::Timeout(_))));
    assert_eq!(dashboard.records.len(), 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Dashboard
// ─────────────────────────────────────────────────────────────────────────────

fn remote_doc(machine: &str, key: &str, at: DateTime<Utc>) -> LicenseRecord {
    LicenseRecord {
        machine_id: machine.into(),
        license_key: key.into(),
        customer_name: String::new(),
        contact_email: String::new(),
        note: String::new(),
        generated_by: "other-host".into(),
        status: LicenseStatus::Generated,
        source: "license_manager_page".into(),
        generated_at: Some(at),
        valid_until: None,
        updated_at: None,
    }
}

#[tokio::test]
async fn dashboard_merges_and_annotates() -> anyhow::Result<()> {
    let (manager, _, remote) = manager(settings_with_remote()).await?;
    let operator = Operator::cashier("till");

    manager
        .issue(&IssueRequest::new("DESKTOP-123"), &operator, noon())
        .await?;
    // Issued elsewhere, an hour ago; never seen locally.
    remote.insert_raw(&target(), remote_doc("KASSE-9", "REMOTE-ONLY", noon() - Duration::hours(1)))?;

    let now = noon() + Duration::minutes(5);
    let dashboard = manager.dashboard(&now).await?;

    // The pushed copy of the local key is deduplicated.
    assert_eq!(dashboard.records.len(), 2);
    assert_eq!(dashboard.records[0].machine_id, "DESKTOP-123");
    assert_eq!(dashboard.records[0].status, LicenseStatus::Valid);
    assert_eq!(dashboard.records[1].machine_id, "KASSE-9");
    assert_eq!(dashboard.records[1].status, LicenseStatus::Expired);
    assert_eq!(
        dashboard.records[1].valid_until,
        Some(noon() - Duration::minutes(50))
    );

    assert_eq!(dashboard.stats.total_keys, 2);
    assert_eq!(dashboard.stats.unique_machines, 2);
    assert_eq!(dashboard.stats.last_generated, Some(noon()));
    assert_eq!(dashboard.license_email, "ops@example.com");
    assert!(dashboard.remote_warning.is_none());
    Ok(())
}

#[tokio::test]
async fn dashboard_status_flips_after_expiry() -> anyhow::Result<()> {
    let (manager, _, _) = manager(settings_with_remote()).await?;
    manager
        .issue(&IssueRequest::new("DESKTOP-123"), &Operator::cashier("till"), noon())
        .await?;

    let at_expiry = manager.dashboard(&(noon() + Duration::minutes(10))).await?;
    assert_eq!(at_expiry.records[0].status, LicenseStatus::Valid);

    let after = manager.dashboard(&(noon() + Duration::minutes(11))).await?;
    assert_eq!(after.records[0].status, LicenseStatus::Expired);
    Ok(())
}

#[tokio::test]
async fn dashboard_today_uses_viewer_zone() -> anyhow::Result<()> {
    let (manager, _, _) = manager(settings_with_remote()).await?;
    let operator = Operator::cashier("till");

    // 20:00 UTC on the 13th is 01:30 on the 14th in UTC+05:30.
    let late = Utc.with_ymd_and_hms(2026, 2, 13, 20, 0, 0).unwrap();
    manager.issue(&IssueRequest::new("ALPHA-1"), &operator, noon()).await?;
    manager.issue(&IssueRequest::new("BRAVO-2"), &operator, late).await?;

    let ist = FixedOffset::east_opt(5 * 3600 + 1800).expect("offset");
    let now = ist.with_ymd_and_hms(2026, 2, 14, 9, 0, 0).unwrap();

    let dashboard = manager.dashboard(&now).await?;
    assert_eq!(dashboard.stats.total_keys, 2);
    assert_eq!(dashboard.stats.today_keys, 1);
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Remote Settings
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn only_admin_saves_remote_settings() -> anyhow::Result<()> {
    let (manager, store, _) = manager(settings_with_remote()).await?;

    for role in [Role::Supervisor, Role::Cashier] {
        let err = manager
            .save_remote_settings(&Operator::new("someone", role), &target())
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::NotAuthorized(_)));
        assert_eq!(err.to_string(), "Only admin can change MongoDB settings.");
    }

    assert!(store.load_remote_config().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn remote_settings_require_db_and_collection() -> anyhow::Result<()> {
    let (manager, store, _) = manager(settings_with_remote()).await?;

    let err = manager
        .save_remote_settings(
            &Operator::admin("admin"),
            &RemoteTarget::new("mongodb://elsewhere", "  ", "keys"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ManagerError::InvalidSettings(_)));
    assert_eq!(err.to_string(), "Mongo DB and Collection are required.");

    assert!(store.load_remote_config().await?.is_none());
    Ok(())
}

#[tokio::test]
async fn saved_settings_apply_to_next_call() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let shared_path = dir.path().join("MahilMartPOS").join("license_mongo_config.ini");
    let settings = Settings {
        shared_config_path: Some(shared_path.clone()),
        ..settings_with_remote()
    };
    let (manager, store, remote) = manager(settings).await?;

    let archive = RemoteTarget::new("mongodb://localhost:27017", "archive_db", "archive_keys");
    let outcome = manager
        .save_remote_settings(&Operator::admin("admin"), &archive)
        .await?;

    assert!(outcome.shared_file_warning.is_none());
    assert_eq!(*outcome.target, archive);
    assert_eq!(*manager.remote_target(), archive);

    let persisted = store.load_remote_config().await?.expect("persisted");
    assert_eq!(persisted.target, archive);
    assert_eq!(persisted.updated_by, "admin");

    let shared = license_manager::SharedConfigFile::new(&shared_path)
        .read()?
        .expect("written");
    assert_eq!(shared, archive);

    manager
        .issue(&IssueRequest::new("DESKTOP-123"), &Operator::cashier("till"), noon())
        .await?;
    assert_eq!(remote.documents(&archive)?.len(), 1);
    assert!(remote.documents(&target())?.is_empty());
    Ok(())
}

#[tokio::test]
async fn unwritable_shared_file_is_a_warning() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // A directory in the file's place cannot be overwritten.
    let shared_path = dir.path().join("license_mongo_config.ini");
    std::fs::create_dir(&shared_path)?;

    let settings = Settings {
        shared_config_path: Some(shared_path),
        ..settings_with_remote()
    };
    let (manager, store, _) = manager(settings).await?;

    let outcome = manager
        .save_remote_settings(&Operator::admin("admin"), &target())
        .await?;

    let warning = outcome.shared_file_warning.expect("warning");
    assert!(warning.starts_with("Could not update POS shared Mongo config"));
    assert!(store.load_remote_config().await?.is_some());
    Ok(())
}
