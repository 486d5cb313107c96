//! State Migration
//!
//! Brings the persisted application state from whatever schema version is on the device
//! to the latest one, once at startup, before anything else reads it.
//!
//! # Overview
//!
//! The migration system consists of:
//! - [`MigrationController`]: Detects the version and runs the step chain under a
//!   process-wide lock
//! - [`VersionDetector`]: Reads the version marker, or classifies legacy installs by
//!   sentinel keys
//! - [`MigrationStep`]: One `N → N+1` transformation (see [`steps`])
//! - [`StateStores`]: Typed JSON access to the three host stores ([`StoreKind`])
//!
//! The schema version is stored as a JSON integer under
//! [`keys::STATE_VERSION_KEY`] in the preference store. Every step persists its own target
//! version before cleaning up, so a run interrupted at any point resumes from the last
//! completed step on the next launch.
//!
//! # Usage
//!
//! ## Platform Usage (Swift/Kotlin)
//!
//! ```swift
//! let controller = MigrationController(
//!     documents: documentStore,
//!     preferences: preferenceStore,
//!     secure: keychainStore,
//!     tokenService: jwtTokenService()
//! )
//!
//! // Blocks startup until the state is on the latest schema
//! let summary = try await controller.migrateIfNeeded()
//! ```
//!
//! ```kotlin
//! val controller = MigrationController(documents, preferences, secure, jwtTokenService())
//! val summary = controller.migrateIfNeeded()
//! ```
//!
//! ## Adding a Schema Version
//!
//! 1. Add a `keys::vN` table with the keys the new schema introduces or retires
//! 2. Add `steps/v{N-1}_to_vN.rs` implementing [`MigrationStep`]; it must persist
//!    `N` with [`StateStores::set_state_version`] before removing superseded keys
//! 3. Append it to [`steps::default_steps`] and bump [`keys::LATEST_STATE_VERSION`]

mod controller;
mod detector;
mod error;
pub mod keys;
pub mod state;
mod step;
pub mod steps;
mod stores;


// Public API exports
pub use controller::{MigrationController, MigrationRunSummary};
pub use detector::{VersionDetector, FRESH_INSTALL_VERSION};
pub use error::{MigrationError, MigrationResult};
pub use step::{MigrationStep, StepOutcome};
pub use stores::{StateStores, StoreKind};

/// Latest state schema version this library migrates to
#[uniffi::export]
#[must_use]
#[allow(clippy::missing_const_for_fn)]
pub fn latest_state_version() -> i32 {
    keys::LATEST_STATE_VERSION
}
