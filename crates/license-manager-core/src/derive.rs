//! Key derivation: machine id + time window → license key + expiry.
//!
//! Two seed policies are supported:
//!
//! - [`SeedMode::Windowed`] (default): the seed includes the start of the
//!   epoch-aligned validity bucket containing the generation time, so the key
//!   is stable inside one bucket and changes in the next.
//! - [`SeedMode::PosStatic`]: the seed is time-independent, so a machine
//!   always gets the same key.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::key::LicenseKey;
use crate::machine::MachineId;

/// Validity window used when the configured value is missing or unparsable.
pub const DEFAULT_VALIDITY_MINUTES: u32 = 10;

/// Layout of the bucket timestamp embedded in windowed seeds.
const WINDOW_FORMAT: &str = "%Y%m%d%H%M";

/// How the derivation seed is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Seed includes the validity bucket start.
    #[default]
    Windowed,
    /// Seed is `EMAIL|MACHINE` only.
    PosStatic,
}

impl SeedMode {
    /// Parse a configured mode. Anything other than `pos_static` is windowed.
    pub fn from_config_str(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pos_static" => SeedMode::PosStatic,
            "" | "windowed" => SeedMode::Windowed,
            other => {
                tracing::warn!(mode = other, "unknown key seed mode, using windowed");
                SeedMode::Windowed
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SeedMode::Windowed => "windowed",
            SeedMode::PosStatic => "pos_static",
        }
    }
}

impl fmt::Display for SeedMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SeedMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_config_str(s))
    }
}

/// Lifetime of an issued key, in whole minutes (at least 1).
///
/// Also the bucket width for [`SeedMode::Windowed`] derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct ValidityWindow(u32);

impl ValidityWindow {
    /// Create a window, clamping to the 1-minute floor.
    pub fn from_minutes(minutes: u32) -> Self {
        Self(minutes.max(1))
    }

    /// Parse a configured value.
    ///
    /// Integers below 1 clamp to 1; anything non-numeric falls back to
    /// [`DEFAULT_VALIDITY_MINUTES`]. Never fails.
    pub fn from_config_str(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Self::default();
        }
        match trimmed.parse::<i64>() {
            Ok(value) => Self(value.clamp(1, u32::MAX as i64) as u32),
            Err(_) => {
                tracing::warn!(
                    value = trimmed,
                    default = DEFAULT_VALIDITY_MINUTES,
                    "invalid key validity minutes, using default"
                );
                Self::default()
            }
        }
    }

    pub fn minutes(self) -> u32 {
        self.0
    }

    pub fn as_duration(self) -> Duration {
        Duration::minutes(i64::from(self.0))
    }

    fn seconds(self) -> i64 {
        i64::from(self.0) * 60
    }

    /// Start of the epoch-aligned bucket containing `at`.
    pub fn window_start(self, at: DateTime<Utc>) -> DateTime<Utc> {
        let width = self.seconds();
        let bucket = at.timestamp().div_euclid(width);
        Utc.timestamp_opt(bucket * width, 0)
            .single()
            .unwrap_or(at)
    }

    /// Expiry of a key generated at `generated_at`.
    pub fn expiry(self, generated_at: DateTime<Utc>) -> DateTime<Utc> {
        generated_at + self.as_duration()
    }
}

impl Default for ValidityWindow {
    fn default() -> Self {
        Self(DEFAULT_VALIDITY_MINUTES)
    }
}

impl From<u32> for ValidityWindow {
    fn from(minutes: u32) -> Self {
        Self::from_minutes(minutes)
    }
}

impl From<ValidityWindow> for u32 {
    fn from(window: ValidityWindow) -> Self {
        window.0
    }
}

/// The configured inputs to derivation, shared by every issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationPolicy {
    pub seed_mode: SeedMode,
    /// Secret seed material; uppercased before use.
    pub license_email: String,
    pub validity: ValidityWindow,
}

impl DerivationPolicy {
    pub fn new(license_email: impl Into<String>) -> Self {
        Self {
            seed_mode: SeedMode::default(),
            license_email: license_email.into(),
            validity: ValidityWindow::default(),
        }
    }

    pub fn seed_mode(mut self, seed_mode: SeedMode) -> Self {
        self.seed_mode = seed_mode;
        self
    }

    pub fn validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = validity;
        self
    }

    /// Build the seed string for `machine_id` at `generated_at`.
    pub fn seed(&self, machine_id: &MachineId, generated_at: DateTime<Utc>) -> String {
        let email = self.license_email.to_uppercase();
        match self.seed_mode {
            SeedMode::PosStatic => format!("{email}|{machine_id}"),
            SeedMode::Windowed => {
                let start = self.validity.window_start(generated_at);
                format!("{email}|{machine_id}|{}", start.format(WINDOW_FORMAT))
            }
        }
    }
}

/// A freshly derived key and its expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    pub key: LicenseKey,
    pub generated_at: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

/// Derive the license key for `machine_id` generated at `generated_at`.
///
/// Pure and deterministic: equal inputs (and, in windowed mode, equal
/// buckets) give byte-identical keys.
pub fn derive(
    machine_id: &MachineId,
    generated_at: DateTime<Utc>,
    policy: &DerivationPolicy,
) -> DerivedKey {
    let seed = policy.seed(machine_id, generated_at);
    let key = LicenseKey::from_seed(&seed);
    tracing::debug!(
        machine_id = %machine_id,
        seed_mode = %policy.seed_mode,
        validity_minutes = policy.validity.minutes(),
        "derived license key"
    );
    DerivedKey {
        key,
        generated_at,
        valid_until: policy.validity.expiry(generated_at),
    }
}
