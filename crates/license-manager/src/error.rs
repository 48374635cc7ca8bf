//! Error types for the License Manager facade.

use license_manager_core::ValidationError;
use license_manager_store::StoreError;
use thiserror::Error;

/// Errors that can occur during License Manager operations.
///
/// Remote replica failures are not here: they never abort an operation and
/// are reported alongside its result instead.
#[derive(Debug, Error)]
pub enum ManagerError {
    /// Rejected machine identifier; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Local storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Not authorized.
    #[error("{0}")]
    NotAuthorized(String),

    /// Rejected remote settings.
    #[error("{0}")]
    InvalidSettings(String),
}

/// Result type for License Manager operations.
pub type Result<T> = std::result::Result<T, ManagerError>;
