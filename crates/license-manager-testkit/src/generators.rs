//! Proptest generators for property-based testing.

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

use license_manager_core::{
    derive, DerivationPolicy, DerivedKey, LicenseRecord, LicenseStatus, MachineId, SeedMode,
    ValidityWindow,
};

/// Generate an already-normalized, valid machine id.
pub fn machine_id() -> impl Strategy<Value = MachineId> {
    "[A-Z0-9._-]{3,64}"
        .prop_map(|raw| MachineId::parse(&raw).expect("generated id matches the grammar"))
}

/// Generate raw form input that normalizes to a valid id: lowercase letters
/// and surrounding whitespace.
pub fn raw_machine_id() -> impl Strategy<Value = String> {
    ("[ \t]{0,3}", "[a-zA-Z0-9._-]{3,64}", "[ \t\n]{0,3}")
        .prop_map(|(lead, body, trail)| format!("{lead}{body}{trail}"))
}

/// Generate a seed email.
pub fn license_email() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9.]{0,15}@[a-z]{1,10}\\.[a-z]{2,4}".prop_map(String::from)
}

/// Generate a timestamp between 2000 and 2100, minute precision.
pub fn generated_at() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64 / 60..4_102_444_800i64 / 60).prop_map(|minutes| {
        Utc.timestamp_opt(minutes * 60, 0)
            .single()
            .expect("timestamp in range")
    })
}

/// Generate a seed mode.
pub fn seed_mode() -> impl Strategy<Value = SeedMode> {
    prop_oneof![Just(SeedMode::Windowed), Just(SeedMode::PosStatic)]
}

/// Generate a validity window.
pub fn validity() -> impl Strategy<Value = ValidityWindow> {
    (1u32..=24 * 60).prop_map(ValidityWindow::from_minutes)
}

/// Parameters for one derivation.
#[derive(Debug, Clone)]
pub struct DeriveParams {
    pub machine_id: MachineId,
    pub generated_at: DateTime<Utc>,
    pub policy: DerivationPolicy,
}

impl Arbitrary for DeriveParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            machine_id(),
            generated_at(),
            license_email(),
            seed_mode(),
            validity(),
        )
            .prop_map(|(machine_id, generated_at, email, mode, validity)| DeriveParams {
                machine_id,
                generated_at,
                policy: DerivationPolicy::new(email)
                    .seed_mode(mode)
                    .validity(validity),
            })
            .boxed()
    }
}

/// Derive a key from parameters.
pub fn derive_from_params(params: &DeriveParams) -> DerivedKey {
    derive(&params.machine_id, params.generated_at, &params.policy)
}

/// Generate a stored record. Keys are drawn from a small pool so that
/// duplicates across sources are common.
pub fn record() -> impl Strategy<Value = LicenseRecord> {
    (
        machine_id(),
        prop_oneof![Just(String::new()), "KEY-[0-9]{1}".prop_map(String::from)],
        proptest::option::weighted(0.9, 0i64..10_000),
        proptest::option::of(0i64..20),
    )
        .prop_map(|(machine_id, license_key, offset, validity)| {
            let base = Utc
                .with_ymd_and_hms(2026, 2, 13, 0, 0, 0)
                .single()
                .expect("fixed date");
            let generated_at = offset.map(|m| base + Duration::minutes(m));
            LicenseRecord {
                machine_id: machine_id.into_string(),
                license_key,
                customer_name: String::new(),
                contact_email: String::new(),
                note: String::new(),
                generated_by: String::new(),
                status: LicenseStatus::Valid,
                source: String::new(),
                generated_at,
                valid_until: generated_at
                    .zip(validity)
                    .map(|(at, m)| at + Duration::minutes(m)),
                updated_at: generated_at,
            }
        })
}

/// Generate a list of records.
pub fn records(max_len: usize) -> impl Strategy<Value = Vec<LicenseRecord>> {
    prop::collection::vec(record(), 0..=max_len)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use license_manager_core::{is_valid, merge, merge_recent, normalize, LicenseKey};

    proptest! {
        #[test]
        fn derivation_is_deterministic(params: DeriveParams) {
            let a = derive_from_params(&params);
            let b = derive_from_params(&params);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn derived_key_has_valid_shape(params: DeriveParams) {
            let derived = derive_from_params(&params);
            prop_assert!(LicenseKey::has_valid_shape(derived.key.as_str()));
            prop_assert_eq!(
                derived.valid_until - derived.generated_at,
                params.policy.validity.as_duration()
            );
        }

        #[test]
        fn same_bucket_gives_same_key(params: DeriveParams) {
            let window = params.policy.validity;
            let start = window.window_start(params.generated_at);
            let last = start + window.as_duration() - Duration::seconds(1);

            let a = derive(&params.machine_id, start, &params.policy);
            let b = derive(&params.machine_id, last, &params.policy);
            prop_assert_eq!(a.key, b.key);
        }

        #[test]
        fn adjacent_buckets_give_distinct_keys(params: DeriveParams) {
            let policy = params.policy.clone().seed_mode(SeedMode::Windowed);
            let start = policy.validity.window_start(params.generated_at);
            let next = start + policy.validity.as_duration();

            let a = derive(&params.machine_id, start, &policy);
            let b = derive(&params.machine_id, next, &policy);
            prop_assert_ne!(a.key, b.key);
        }

        #[test]
        fn distinct_machines_give_distinct_keys(params: DeriveParams, other in machine_id()) {
            prop_assume!(other != params.machine_id);

            let a = derive_from_params(&params);
            let b = derive(&other, params.generated_at, &params.policy);
            prop_assert_ne!(a.key, b.key);
        }

        #[test]
        fn pos_static_ignores_time(params: DeriveParams, later in generated_at()) {
            let policy = params.policy.clone().seed_mode(SeedMode::PosStatic);
            let a = derive(&params.machine_id, params.generated_at, &policy);
            let b = derive(&params.machine_id, later, &policy);
            prop_assert_eq!(a.key, b.key);
        }

        #[test]
        fn normalize_is_idempotent(raw in "[ \t\na-zA-Z0-9._\\-äöß]{0,80}") {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn raw_input_parses(raw in raw_machine_id()) {
            let id = MachineId::parse(&raw);
            prop_assert!(id.is_ok(), "{:?}", raw);
            prop_assert!(is_valid(id.unwrap().as_str()));
        }

        #[test]
        fn merge_dedups_sorts_and_limits(
            local in records(30),
            remote in records(30),
            limit in 0usize..40,
        ) {
            let merged = merge_recent(local, remote, limit);

            prop_assert!(merged.len() <= limit.max(1));

            let mut seen = HashSet::new();
            for record in &merged {
                if let Some(key) = record.dedup_key() {
                    prop_assert!(seen.insert(key.to_string()), "duplicate key {}", key);
                }
            }

            for pair in merged.windows(2) {
                prop_assert!(pair[0].generated_at >= pair[1].generated_at);
            }
        }

        #[test]
        fn merge_status_matches_expiry(local in records(20), remote in records(20)) {
            // Inside the generated range, so both statuses occur.
            let now = Utc.with_ymd_and_hms(2026, 2, 16, 11, 20, 0).unwrap();
            let window = ValidityWindow::from_minutes(10);

            for record in merge(local, remote, 100, now, window) {
                let expected = match record.valid_until {
                    Some(expiry) if expiry >= now => LicenseStatus::Valid,
                    _ => LicenseStatus::Expired,
                };
                prop_assert_eq!(record.status, expected);
            }
        }
    }
}
