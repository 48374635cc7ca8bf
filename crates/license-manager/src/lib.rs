//! # License Manager
//!
//! Issues time-windowed, machine-bound license keys for POS terminals and
//! keeps a reconciled view of them across a local SQLite store and a remote
//! document-store replica.
//!
//! ## Overview
//!
//! - **Issuance**: a raw machine id is normalized and validated, a key is
//!   derived, the local row for the machine is overwritten, and the record is
//!   pushed to the replica on a best-effort basis
//! - **Dashboard**: local and remote records are merged, deduplicated by key,
//!   and annotated as valid or expired at read time
//! - **Remote settings**: an admin can retarget the replica at runtime
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chrono::Utc;
//! use license_manager::{IssueRequest, LicenseManager, Operator, Settings};
//!
//! async fn example() -> license_manager::Result<()> {
//!     let manager = LicenseManager::open(Settings::from_process_env()).await?;
//!
//!     let outcome = manager
//!         .issue(
//!             &IssueRequest::new(" desktop-123 ").customer_name("Alice"),
//!             &Operator::cashier("till_1"),
//!             Utc::now(),
//!         )
//!         .await?;
//!     println!("{}", outcome.message(&Utc));
//!
//!     let dashboard = manager.dashboard(&Utc::now()).await?;
//!     println!("{} keys", dashboard.stats.total_keys);
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `license_manager::core` - Normalization, derivation, reconciliation
//! - `license_manager::store` - Local and remote storage

pub mod config;
pub mod env;
pub mod error;
pub mod manager;
pub mod operator;
pub mod settings;
pub mod shared_config;

// Re-export component crates
pub use license_manager_core as core;
pub use license_manager_store as store;

// Re-export main types for convenience
pub use config::{resolve, RemoteConfigProvider};
pub use env::Env;
pub use error::{ManagerError, Result};
pub use manager::{
    Dashboard, DefaultRemote, IssueOutcome, IssueRequest, LicenseManager, SettingsOutcome,
};
pub use operator::{Operator, Role};
pub use settings::Settings;
pub use shared_config::{ConfigError, SharedConfigFile};

// Re-export commonly used core types
pub use license_manager_core::{
    DashboardStats, DerivationPolicy, LicenseKey, LicenseRecord, LicenseStatus, MachineId,
    RemoteTarget, SeedMode, ValidationError, ValidityWindow,
};
