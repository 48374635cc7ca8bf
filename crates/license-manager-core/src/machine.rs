//! Machine identifiers: normalization and validation.
//!
//! A machine identifier is the persistent, installer-assigned id of a POS
//! terminal. Operators type or paste it, so it is canonicalized before it is
//! validated, derived from, or stored.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Minimum length of a valid machine identifier.
pub const MIN_MACHINE_ID_LEN: usize = 3;

/// Maximum length of a valid machine identifier.
pub const MAX_MACHINE_ID_LEN: usize = 64;

static VALID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9._-]{3,64}$").expect("static pattern"));

static BROWSER_STYLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^POS-[0-9A-F]{8}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{4}-[0-9A-F]{12}$")
        .expect("static pattern")
});

/// Canonicalize a raw machine identifier.
///
/// Removes all whitespace (leading, trailing, and internal) and uppercases.
/// The ASCII separators `\x1c`..=`\x1f` count as whitespace too, as they do
/// for the POS terminals. Total: never fails, empty input yields an empty
/// string.
pub fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|&c| !is_space(c))
        .flat_map(char::to_uppercase)
        .collect()
}

fn is_space(c: char) -> bool {
    c.is_whitespace() || ('\u{1c}'..='\u{1f}').contains(&c)
}

/// Check whether `id` (after normalization) matches `[A-Z0-9._-]{3,64}`.
pub fn is_valid(id: &str) -> bool {
    VALID_RE.is_match(&normalize(id))
}

/// Check whether `id` (after normalization) is a browser-generated UUID.
///
/// These ids match the generic pattern but come from the POS web client's
/// local storage rather than the installer, so they are refused for licensing.
pub fn is_browser_style(id: &str) -> bool {
    BROWSER_STYLE_RE.is_match(&normalize(id))
}

/// A normalized machine identifier that is accepted for licensing.
///
/// The only constructor is [`MachineId::parse`], so holding a `MachineId`
/// means the id is valid and not browser-style.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MachineId(String);

impl MachineId {
    /// Normalize and validate a raw identifier.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let value = normalize(raw);
        if !VALID_RE.is_match(&value) {
            return Err(ValidationError::InvalidMachineId(value));
        }
        if BROWSER_STYLE_RE.is_match(&value) {
            return Err(ValidationError::BrowserStyleMachineId(value));
        }
        Ok(Self(value))
    }

    /// The canonical string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the canonical string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Debug for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MachineId({})", self.0)
    }
}

impl fmt::Display for MachineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MachineId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for MachineId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MachineId> for String {
    fn from(id: MachineId) -> Self {
        id.0
    }
}
