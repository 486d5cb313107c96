use crate::keystate_error::keystate_error;
use crate::migration::stores::StoreKind;

/// Errors that can occur during migration operations
#[keystate_error]
pub enum MigrationError {
    /// An invalid operation was attempted
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Key-value store operation failed
    #[error(transparent)]
    KeyValueStore(#[from] crate::device::KeyValueStoreError),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {message}")]
    JsonError {
        /// The error message from serde_json
        message: String,
    },

    /// A key that must exist at this schema version is absent. The persisted data is
    /// corrupted and the migration cannot proceed.
    #[error("missing required key `{key}` in the {store} store")]
    MissingRequiredKey {
        /// Store that was expected to hold the key
        store: StoreKind,
        /// The missing key
        key: String,
    },

    /// The persisted data is in a schema this build does not know
    #[error("unsupported state version {version} (latest known is {latest})")]
    UnsupportedVersion {
        /// Version found on the device
        version: i32,
        /// Latest version this build migrates to
        latest: i32,
    },

    /// A step returned without persisting its target version
    #[error("step did not advance the state version to {expected} (found {found:?})")]
    VersionNotAdvanced {
        /// Version the step should have persisted
        expected: i32,
        /// Version found after the step
        found: Option<i32>,
    },

    /// The session/token service failed
    #[error(transparent)]
    TokenService(#[from] crate::session::TokenServiceError),
}

impl From<serde_json::Error> for MigrationError {
    fn from(e: serde_json::Error) -> Self {
        Self::JsonError {
            message: e.to_string(),
        }
    }
}

/// Result type for migration operations
pub type MigrationResult<T> = std::result::Result<T, MigrationError>;
