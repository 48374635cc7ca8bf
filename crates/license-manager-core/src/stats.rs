//! Aggregate statistics over a reconciled record list.

use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::record::LicenseRecord;

/// Dashboard counters.
///
/// Always computed from the merged, annotated view, never from one store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_keys: usize,
    /// Records generated on the viewer's local calendar day.
    pub today_keys: usize,
    pub unique_machines: usize,
    pub last_generated: Option<DateTime<Utc>>,
}

/// Summarize `records`, which must already be in merged (newest-first) order.
///
/// "Today" is the calendar day of `now` in `now`'s time zone.
pub fn summarize<Tz: TimeZone>(records: &[LicenseRecord], now: &DateTime<Tz>) -> DashboardStats {
    let tz = now.timezone();
    let today = now.date_naive();

    let today_keys = records
        .iter()
        .filter_map(|r| r.generated_at)
        .filter(|at| at.with_timezone(&tz).date_naive() == today)
        .count();

    let unique_machines = records
        .iter()
        .map(|r| r.machine_id.as_str())
        .filter(|m| !m.is_empty())
        .collect::<HashSet<_>>()
        .len();

    DashboardStats {
        total_keys: records.len(),
        today_keys,
        unique_machines,
        last_generated: records.first().and_then(|r| r.generated_at),
    }
}
