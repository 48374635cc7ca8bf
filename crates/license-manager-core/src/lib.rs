//! # License Manager Core
//!
//! Pure primitives for the License Manager: machine identifiers, license key
//! derivation, and reconciliation of license records.
//!
//! This crate contains no I/O, no storage, no networking. Every function is a
//! bounded computation over its inputs.
//!
//! ## Key Types
//!
//! - [`MachineId`] - A normalized, licensable machine identifier
//! - [`LicenseKey`] - A 32-character derived key
//! - [`DerivationPolicy`] - Seed mode, seed email, and validity window
//! - [`LicenseRecord`] - One issued license as held by a store
//! - [`RemoteTarget`] - Where the remote replica lives
//!
//! ## Derivation
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use license_manager_core::{derive, DerivationPolicy, MachineId};
//!
//! let machine = MachineId::parse(" desktop-123 ").unwrap();
//! let at = Utc.with_ymd_and_hms(2026, 2, 13, 12, 0, 0).unwrap();
//! let derived = derive(&machine, at, &DerivationPolicy::new("ops@example.com"));
//!
//! assert_eq!(derived.key.as_str(), "Pu8Lw2Su2Y&u3Ey7Yf2Ho!9Bi2Px2He7");
//! ```
//!
//! ## Security
//!
//! The key mixing function is an obfuscation scheme, not a MAC. Anyone who
//! can read this crate can mint keys. Its arithmetic is kept bit-exact for
//! compatibility with keys already issued to terminals.

pub mod derive;
pub mod error;
pub mod key;
pub mod machine;
pub mod reconcile;
pub mod record;
pub mod stats;

pub use derive::{derive, DerivationPolicy, DerivedKey, SeedMode, ValidityWindow, DEFAULT_VALIDITY_MINUTES};
pub use error::ValidationError;
pub use key::LicenseKey;
pub use machine::{is_browser_style, is_valid, normalize, MachineId};
pub use reconcile::{annotate_status, merge, merge_recent, DEFAULT_MERGE_LIMIT};
pub use record::{LicenseRecord, LicenseStatus, RemoteTarget, DEFAULT_SOURCE};
pub use stats::{summarize, DashboardStats};
