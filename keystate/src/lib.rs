#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    dead_code
)]

//! `keystate` brings a client application's on-device persisted state up to the current
//! storage schema.
//!
//! It runs once at application startup, before anything else reads persisted state:
//! it detects which schema version the data on the device is in and applies the ordered
//! chain of migration steps up to the latest version, moving data between the document,
//! preference and secure stores provided by the host platform.

/// Device storage abstractions implemented by the host platform.
pub mod device;

/// Error handling helpers shared across the crate.
pub mod keystate_error;

/// The migration engine: version detection, the step chain and the controller running it.
pub mod migration;

/// Low level primitives: logging and global configuration.
pub mod primitives;

/// Session/token service used to recover account identity from a stored access token.
pub mod session;

uniffi::setup_scaffolding!("keystate");
