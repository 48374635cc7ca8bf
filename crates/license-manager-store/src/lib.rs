//! # License Manager Store
//!
//! Storage abstraction for the License Manager. Provides trait-based
//! interfaces for the authoritative local store and the best-effort remote
//! replica.
//!
//! ## Overview
//!
//! License records live in two places. The [`LicenseStore`] trait covers the
//! local store, implemented by [`SqliteStore`] with [`MemoryStore`] for tests.
//! The [`RemoteStore`] trait covers the replica, implemented by
//! `MongoRemoteStore` (feature `mongo`), [`MemoryRemoteStore`] for tests, and
//! [`UnavailableRemote`] for builds without a driver.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use license_manager_store::{LicenseStore, SqliteStore};
//!
//! async fn example() -> license_manager_store::Result<()> {
//!     let store = SqliteStore::open("licenses.db")?;
//!     for record in store.list_recent(10).await? {
//!         println!("{} {}", record.machine_id, record.license_key);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **One row per machine**: upserts overwrite the machine's row and collapse
//!   duplicates in a single transaction
//! - **Remote target per call**: remote stores never cache connection settings
//! - **Remote errors are soft**: [`RemoteError`] is reported, never fatal

pub mod error;
pub mod memory;
pub mod migration;
#[cfg(feature = "mongo")]
pub mod mongo;
pub mod remote;
pub mod sqlite;
pub mod traits;

pub use error::{RemoteError, RemoteResult, Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "mongo")]
pub use mongo::MongoRemoteStore;
pub use remote::MemoryRemoteStore;
pub use sqlite::SqliteStore;
pub use traits::{LicenseStore, PersistedRemoteConfig, RemoteStore, UnavailableRemote};
