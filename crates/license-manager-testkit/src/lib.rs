//! # License Manager Testkit
//!
//! Testing utilities for the License Manager.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Golden vectors**: Known derivations with expected keys, pinned so keys
//!   already issued to terminals keep validating
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: A manager over in-memory stores for integration tests
//!
//! ## Golden Vectors
//!
//! ```rust
//! use license_manager_testkit::vectors::{all_vectors, derive_from_vector};
//!
//! for vector in all_vectors() {
//!     let derived = derive_from_vector(&vector);
//!     assert_eq!(derived.key.as_str(), vector.expected_key);
//! }
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use license_manager_testkit::generators::{derive_from_params, DeriveParams};
//!
//! proptest! {
//!     #[test]
//!     fn derivation_is_deterministic(params: DeriveParams) {
//!         prop_assert_eq!(derive_from_params(&params), derive_from_params(&params));
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust,ignore
//! use license_manager_testkit::fixtures::{at, TestFixture};
//!
//! let fixture = TestFixture::new().await?;
//! let outcome = fixture.issue("desktop-123", at(12, 0)).await?;
//! assert!(outcome.synced());
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{fixture_settings, TestFixture};
pub use generators::{derive_from_params, DeriveParams};
pub use vectors::{all_vectors, derive_from_vector, verify_all_vectors, GoldenVector};
