//! Device storage abstractions
//!
//! The host platform owns three independent key-value stores and hands them to the
//! migration engine through [`DeviceKeyValueStore`]:
//!
//! - the **document store**, a general purpose JSON document store,
//! - the **preference store**, lightweight settings (`SharedPreferences` / `UserDefaults`),
//! - the **secure store**, encrypted storage (Keystore / Keychain).
//!
//! All values are JSON documents stored as strings.

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur during key-value store operations
#[allow(clippy::module_name_repetitions)]
#[derive(Debug, Error, uniffi::Error)]
pub enum KeyValueStoreError {
    /// Failed to read the stored value
    #[error("failed to read value")]
    ReadFailure,
    /// Failed to update the value in the store
    #[error("failed to update value")]
    UpdateFailure,
    /// Unexpected error in foreign callback
    #[error("unexpected error in foreign callback: {0}")]
    UnexpectedUniFFICallbackError(String),
}

impl From<uniffi::UnexpectedUniFFICallbackError> for KeyValueStoreError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::UnexpectedUniFFICallbackError(e.reason)
    }
}

/// A persistent key-value store implemented by the host platform.
///
/// There are no transactional guarantees, neither across keys nor across stores. A missing
/// key is a regular outcome (`Ok(None)`), never an error.
///
/// ## Kotlin
///
/// ```kotlin
/// class PreferenceStore(private val prefs: SharedPreferences) : DeviceKeyValueStore {
///     override suspend fun get(key: String): String? = prefs.getString(key, null)
///     override suspend fun set(key: String, value: String) = prefs.edit { putString(key, value) }
///     override suspend fun remove(key: String) = prefs.edit { remove(key) }
/// }
/// ```
#[uniffi::export(with_foreign)]
#[async_trait]
pub trait DeviceKeyValueStore: Send + Sync {
    /// Gets the raw value stored under `key`, `None` when the key is absent.
    ///
    /// # Errors
    /// - `KeyValueStoreError::ReadFailure` if the backend fails to read
    async fn get(&self, key: String) -> Result<Option<String>, KeyValueStoreError>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    /// - `KeyValueStoreError::UpdateFailure` if the backend fails to write
    async fn set(&self, key: String, value: String) -> Result<(), KeyValueStoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    /// - `KeyValueStoreError::UpdateFailure` if the backend fails to write
    async fn remove(&self, key: String) -> Result<(), KeyValueStoreError>;
}
