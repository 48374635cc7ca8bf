//! License records and the remote store target.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::derive::{DerivedKey, ValidityWindow};
use crate::machine::MachineId;

/// Source tag stamped on records issued by this service.
pub const DEFAULT_SOURCE: &str = "license_manager_page";

/// Status of a license record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LicenseStatus {
    /// Issued and not yet past its expiry.
    Valid,
    /// Past its expiry.
    Expired,
    /// Provisional default for rows that never carried an expiry.
    #[default]
    Generated,
}

impl LicenseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            LicenseStatus::Valid => "valid",
            LicenseStatus::Expired => "expired",
            LicenseStatus::Generated => "generated",
        }
    }
}

impl fmt::Display for LicenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LicenseStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "valid" => Ok(LicenseStatus::Valid),
            "expired" => Ok(LicenseStatus::Expired),
            "generated" => Ok(LicenseStatus::Generated),
            other => Err(format!("unknown license status: {other}")),
        }
    }
}

/// One issued license, as held by either store.
///
/// `machine_id` is a plain string: records read back from the remote store
/// are not re-validated, and the reconciler must cope with whatever is there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicenseRecord {
    pub machine_id: String,
    pub license_key: String,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub contact_email: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub generated_by: String,
    #[serde(default)]
    pub status: LicenseStatus,
    #[serde(default)]
    pub source: String,
    pub generated_at: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl LicenseRecord {
    /// Start a record for a freshly derived key.
    ///
    /// Status is `valid` and the source is [`DEFAULT_SOURCE`]; customer
    /// fields are empty until set with the builder methods.
    pub fn issued(machine_id: &MachineId, derived: &DerivedKey) -> Self {
        Self {
            machine_id: machine_id.as_str().to_string(),
            license_key: derived.key.as_str().to_string(),
            customer_name: String::new(),
            contact_email: String::new(),
            note: String::new(),
            generated_by: String::new(),
            status: LicenseStatus::Valid,
            source: DEFAULT_SOURCE.to_string(),
            generated_at: Some(derived.generated_at),
            valid_until: Some(derived.valid_until),
            updated_at: Some(derived.generated_at),
        }
    }

    /// Customer name, trimmed.
    pub fn customer_name(mut self, name: &str) -> Self {
        self.customer_name = name.trim().to_string();
        self
    }

    /// Contact email, trimmed and lowercased.
    pub fn contact_email(mut self, email: &str) -> Self {
        self.contact_email = email.trim().to_lowercase();
        self
    }

    /// Free-text note, trimmed.
    pub fn note(mut self, note: &str) -> Self {
        self.note = note.trim().to_string();
        self
    }

    pub fn generated_by(mut self, operator: &str) -> Self {
        self.generated_by = operator.to_string();
        self
    }

    pub fn source(mut self, source: &str) -> Self {
        self.source = source.to_string();
        self
    }

    /// Explicit expiry, or one computed from the generation time.
    pub fn effective_expiry(&self, window: ValidityWindow) -> Option<DateTime<Utc>> {
        self.valid_until
            .or_else(|| self.generated_at.map(|at| window.expiry(at)))
    }

    /// Whether the key is still usable at `now`.
    pub fn is_valid_at(&self, now: DateTime<Utc>, window: ValidityWindow) -> bool {
        self.effective_expiry(window).is_some_and(|expiry| expiry >= now)
    }

    /// The trimmed license key, or `None` when empty.
    pub fn dedup_key(&self) -> Option<&str> {
        let key = self.license_key.trim();
        (!key.is_empty()).then_some(key)
    }
}

/// Connection target for the remote replica store.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteTarget {
    pub uri: String,
    pub database: String,
    pub collection: String,
}

impl RemoteTarget {
    pub fn new(
        uri: impl Into<String>,
        database: impl Into<String>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into().trim().to_string(),
            database: database.into().trim().to_string(),
            collection: collection.into().trim().to_string(),
        }
    }

    /// A target with no URI is treated as "remote disabled".
    pub fn is_configured(&self) -> bool {
        !self.uri.is_empty()
    }

    /// Layer `overlay` on top of `self`, field by field.
    ///
    /// Non-empty overlay fields win; empty ones fall through.
    pub fn overlay(&self, overlay: &RemoteTarget) -> RemoteTarget {
        fn pick(top: &str, base: &str) -> String {
            let top = top.trim();
            if top.is_empty() {
                base.to_string()
            } else {
                top.to_string()
            }
        }
        RemoteTarget {
            uri: pick(&overlay.uri, &self.uri),
            database: pick(&overlay.database, &self.database),
            collection: pick(&overlay.collection, &self.collection),
        }
    }
}

impl fmt::Debug for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // URIs routinely embed credentials.
        f.debug_struct("RemoteTarget")
            .field("uri", &if self.uri.is_empty() { "" } else { "[REDACTED]" })
            .field("database", &self.database)
            .field("collection", &self.collection)
            .finish()
    }
}
