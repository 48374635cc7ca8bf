//! Error types for the License Manager Core.

use thiserror::Error;

/// Validation errors for machine identifiers.
///
/// The display strings are operator-facing: they are shown verbatim when an
/// issuance request is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error(
        "Enter valid Machine ID (3-64 chars: letters, numbers, dot, underscore, hyphen)."
    )]
    InvalidMachineId(String),

    #[error(
        "POS browser UUID not allowed. Use installer machine ID (example: DESKTOP-XXXXXXX)."
    )]
    BrowserStyleMachineId(String),
}

impl ValidationError {
    /// The normalized identifier that was rejected.
    pub fn machine_id(&self) -> &str {
        match self {
            ValidationError::InvalidMachineId(id) | ValidationError::BrowserStyleMachineId(id) => id,
        }
    }
}
