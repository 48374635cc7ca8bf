//! Reconciliation of local and remote license records.
//!
//! The local store is authoritative; the remote replica is best-effort and
//! may hold records the local store never saw (issued from another host) or
//! copies of local records. The merged view is:
//!
//! 1. local then remote, concatenated
//! 2. stable-sorted by generation time, newest first, undated last
//! 3. deduplicated by license key, first occurrence wins
//! 4. truncated to the limit
//! 5. status-annotated against "now"
//!
//! Status is always recomputed at read time so a stored status can never go
//! stale relative to the clock.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::derive::ValidityWindow;
use crate::record::{LicenseRecord, LicenseStatus};

/// Default number of records in the merged view.
pub const DEFAULT_MERGE_LIMIT: usize = 100;

/// Merge, dedup, and truncate without touching status.
///
/// Records with an empty license key are never deduplicated against each
/// other. A `limit` of zero is treated as one.
pub fn merge_recent(
    local: Vec<LicenseRecord>,
    remote: Vec<LicenseRecord>,
    limit: usize,
) -> Vec<LicenseRecord> {
    let limit = limit.max(1);

    let mut merged = local;
    merged.extend(remote);

    // `Option` orders `None` first, so descending puts undated records last.
    merged.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));

    let mut seen: HashSet<String> = HashSet::new();
    let mut kept = Vec::with_capacity(limit.min(merged.len()));

    for record in merged {
        if let Some(key) = record.dedup_key() {
            if !seen.insert(key.to_string()) {
                continue;
            }
        }
        kept.push(record);
        if kept.len() >= limit {
            break;
        }
    }

    kept
}

/// Recompute `valid_until` and `status` for each record at `now`.
///
/// Records without an explicit expiry get one from the generation time.
/// Records with neither are `expired`.
pub fn annotate_status(records: &mut [LicenseRecord], now: DateTime<Utc>, window: ValidityWindow) {
    for record in records.iter_mut() {
        record.valid_until = record.effective_expiry(window);
        record.status = match record.valid_until {
            Some(expiry) if expiry >= now => LicenseStatus::Valid,
            _ => LicenseStatus::Expired,
        };
    }
}

/// Full reconciliation: [`merge_recent`] followed by [`annotate_status`].
pub fn merge(
    local: Vec<LicenseRecord>,
    remote: Vec<LicenseRecord>,
    limit: usize,
    now: DateTime<Utc>,
    window: ValidityWindow,
) -> Vec<LicenseRecord> {
    let local_count = local.len();
    let remote_count = remote.len();

    let mut merged = merge_recent(local, remote, limit);
    annotate_status(&mut merged, now, window);

    tracing::debug!(
        local = local_count,
        remote = remote_count,
        merged = merged.len(),
        "reconciled license records"
    );
    merged
}
