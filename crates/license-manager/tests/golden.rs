//! Golden vectors through the full issuance path.
//!
//! Keys already issued to terminals must keep validating, so every key the
//! manager stores has to match the reference values byte for byte.

use chrono::{DateTime, Duration, TimeZone, Utc};
use license_manager::store::{MemoryRemoteStore, MemoryStore};
use license_manager::{
    DerivationPolicy, IssueRequest, LicenseKey, LicenseManager, Operator, SeedMode, Settings,
    ValidityWindow,
};

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 13, 12, 0, 0).unwrap()
}

fn settings(policy: DerivationPolicy) -> Settings {
    Settings {
        policy,
        ..Settings::default()
    }
}

async fn issue_key(policy: DerivationPolicy, machine: &str, at: DateTime<Utc>) -> String {
    let manager = LicenseManager::new(settings(policy), MemoryStore::new(), MemoryRemoteStore::new())
        .await
        .unwrap();
    manager
        .issue(&IssueRequest::new(machine), &Operator::cashier("till"), at)
        .await
        .unwrap()
        .record
        .license_key
}

#[tokio::test]
async fn golden_windowed_ten_minutes() {
    let policy = DerivationPolicy::new("ops@example.com");

    let key = issue_key(policy.clone(), "DESKTOP-123", noon()).await;
    assert_eq!(key, "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");
    assert!(LicenseKey::has_valid_shape(&key));

    // Same bucket.
    let key = issue_key(policy.clone(), "DESKTOP-123", noon() + Duration::minutes(5)).await;
    assert_eq!(key, "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");

    // Next bucket.
    let key = issue_key(policy, "DESKTOP-123", noon() + Duration::minutes(10)).await;
    assert_eq!(key, "Fw2Zv5Mx9W&k9Fv4Te4Wr#2Tu5Cz4Qi8");
}

#[tokio::test]
async fn golden_raw_input_is_normalized_first() {
    let policy = DerivationPolicy::new("ops@example.com");
    let key = issue_key(policy, "  desktop - 123\t", noon()).await;
    assert_eq!(key, "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");
}

#[tokio::test]
async fn golden_pos_static() {
    let policy = DerivationPolicy::new("ops@example.com").seed_mode(SeedMode::PosStatic);

    let at_noon = issue_key(policy.clone(), "DESKTOP-123", noon()).await;
    let next_day = issue_key(policy, "DESKTOP-123", noon() + Duration::days(1)).await;

    assert_eq!(at_noon, "Sy2Hj6Va9E?m3Pc5Hi8Pp&7Lq2Pw2Vh3");
    assert_eq!(next_day, at_noon);
}

#[tokio::test]
async fn golden_other_machine_and_email() {
    let key = issue_key(
        DerivationPolicy::new("ops@example.com"),
        "POS-TERMINAL_07.A",
        noon(),
    )
    .await;
    assert_eq!(key, "Tk7Fy9Qy8M*s4Wu8Ts3Wx$7Tg9Md7Zr2");

    let key = issue_key(
        DerivationPolicy::new("mahiltechlab.ops@gmail.com"),
        "DESKTOP-123",
        noon(),
    )
    .await;
    assert_eq!(key, "Tn3Th4Zm9M*y4Tg4Qw8Fv@2Jn6Jv2Tk2");
}

#[tokio::test]
async fn golden_sixty_minute_window() {
    let policy = DerivationPolicy::new("ops@example.com").validity(ValidityWindow::from_minutes(60));

    let start = issue_key(policy.clone(), "DESKTOP-123", noon()).await;
    let end = issue_key(policy, "DESKTOP-123", noon() + Duration::minutes(59)).await;

    // Both land in the 12:00 bucket, which the 10-minute window shares.
    assert_eq!(start, "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");
    assert_eq!(end, start);
}

#[tokio::test]
async fn golden_seven_minute_window_is_epoch_aligned() {
    let policy = DerivationPolicy::new("ops@example.com").validity(ValidityWindow::from_minutes(7));

    let at_noon = issue_key(policy.clone(), "DESKTOP-123", noon()).await;
    let later = issue_key(policy, "DESKTOP-123", noon() + Duration::minutes(6)).await;

    // 12:00 falls in the 11:56 bucket, 12:06 in the 12:03 bucket.
    assert_eq!(at_noon, "Vv3Bi7Yi8B@x8Lp5Eh8Yc!4Hb9Sy9Hm5");
    assert_eq!(later, "Vz4Bm4Sp3S@z8Sy7Bk8Yd*6Vd3Bc8Ee7");
}
