use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};

use crate::device::DeviceKeyValueStore;
use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::keys::STATE_VERSION_KEY;

/// The three stores the host platform provides
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum StoreKind {
    /// General purpose document store
    Documents,
    /// Lightweight preference store
    Preferences,
    /// Encrypted store
    Secure,
}

impl StoreKind {
    /// Returns the string representation used in logs and errors
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Documents => "documents",
            Self::Preferences => "preferences",
            Self::Secure => "secure",
        }
    }
}

impl std::fmt::Display for StoreKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Typed access to the document, preference and secure stores.
///
/// Values are JSON documents. Writing "no value" always removes the key: a JSON `null`
/// placeholder is never stored, and a stored `null` reads back as absent.
pub struct StateStores {
    documents: Arc<dyn DeviceKeyValueStore>,
    preferences: Arc<dyn DeviceKeyValueStore>,
    secure: Arc<dyn DeviceKeyValueStore>,
}

impl StateStores {
    /// Groups the three stores
    #[must_use]
    pub fn new(
        documents: Arc<dyn DeviceKeyValueStore>,
        preferences: Arc<dyn DeviceKeyValueStore>,
        secure: Arc<dyn DeviceKeyValueStore>,
    ) -> Self {
        Self {
            documents,
            preferences,
            secure,
        }
    }

    fn backend(&self, kind: StoreKind) -> &dyn DeviceKeyValueStore {
        match kind {
            StoreKind::Documents => self.documents.as_ref(),
            StoreKind::Preferences => self.preferences.as_ref(),
            StoreKind::Secure => self.secure.as_ref(),
        }
    }

    /// Reads the raw JSON stored under `key`, treating a stored `null` as absent.
    async fn get_raw(&self, kind: StoreKind, key: &str) -> MigrationResult<Option<String>> {
        let raw = self.backend(kind).get(key.to_string()).await?;
        Ok(raw.filter(|value| value.trim() != "null"))
    }

    /// Reads and deserializes the value under `key`.
    ///
    /// # Errors
    /// - `MigrationError::KeyValueStore` if the backend fails
    /// - `MigrationError::JsonError` if the stored value does not deserialize into `T`
    pub async fn get<T: DeserializeOwned>(
        &self,
        kind: StoreKind,
        key: &str,
    ) -> MigrationResult<Option<T>> {
        self.get_raw(kind, key)
            .await?
            .map(|raw| serde_json::from_str(&raw))
            .transpose()
            .map_err(MigrationError::from)
    }

    /// Reads a value that must exist at the current schema version.
    ///
    /// # Errors
    /// - `MigrationError::MissingRequiredKey` if the key is absent
    /// - any error of [`StateStores::get`]
    pub async fn require<T: DeserializeOwned>(
        &self,
        kind: StoreKind,
        key: &str,
    ) -> MigrationResult<T> {
        self.get(kind, key)
            .await?
            .ok_or_else(|| MigrationError::MissingRequiredKey {
                store: kind,
                key: key.to_string(),
            })
    }

    /// Serializes and stores `value` under `key`.
    ///
    /// `None`, or a value serializing to JSON `null`, removes the key instead.
    ///
    /// # Errors
    /// - `MigrationError::JsonError` if `value` fails to serialize
    /// - `MigrationError::KeyValueStore` if the backend fails
    pub async fn set<T: Serialize + ?Sized>(
        &self,
        kind: StoreKind,
        key: &str,
        value: Option<&T>,
    ) -> MigrationResult<()> {
        let Some(value) = value else {
            return self.remove(kind, key).await;
        };

        let json = serde_json::to_string(value)?;
        if json == "null" {
            return self.remove(kind, key).await;
        }

        self.backend(kind).set(key.to_string(), json).await?;
        Ok(())
    }

    /// Removes `key`. Absent keys are not an error.
    ///
    /// # Errors
    /// - `MigrationError::KeyValueStore` if the backend fails
    pub async fn remove(&self, kind: StoreKind, key: &str) -> MigrationResult<()> {
        self.backend(kind).remove(key.to_string()).await?;
        Ok(())
    }

    /// Removes every key in `keys` from one store.
    ///
    /// # Errors
    /// - `MigrationError::KeyValueStore` on the first backend failure
    pub async fn remove_all<K: AsRef<str>>(
        &self,
        kind: StoreKind,
        keys: &[K],
    ) -> MigrationResult<()> {
        for key in keys {
            self.remove(kind, key.as_ref()).await?;
        }
        Ok(())
    }

    /// Copies the stored document from one location to another without reinterpreting it.
    ///
    /// The source is left in place; removing it is part of the calling step's cleanup.
    /// Returns whether a value was found. When none is found the destination is removed so
    /// that a stale value cannot survive there.
    ///
    /// # Errors
    /// - `MigrationError::KeyValueStore` if either backend fails
    pub async fn relocate(
        &self,
        from: (StoreKind, &str),
        to: (StoreKind, &str),
    ) -> MigrationResult<bool> {
        let (from_kind, from_key) = from;
        let (to_kind, to_key) = to;

        if let Some(raw) = self.get_raw(from_kind, from_key).await? {
            self.backend(to_kind).set(to_key.to_string(), raw).await?;
            crate::debug!(
                "stores.relocated from={from_kind}:{from_key} to={to_kind}:{to_key}"
            );
            Ok(true)
        } else {
            self.remove(to_kind, to_key).await?;
            Ok(false)
        }
    }

    /// Reads the persisted schema version marker.
    ///
    /// # Errors
    /// - `MigrationError::JsonError` if the marker is not an integer
    /// - `MigrationError::KeyValueStore` if the backend fails
    pub async fn state_version(&self) -> MigrationResult<Option<i32>> {
        self.get(StoreKind::Preferences, STATE_VERSION_KEY).await
    }

    /// Persists the schema version marker.
    ///
    /// # Errors
    /// - `MigrationError::KeyValueStore` if the backend fails
    pub async fn set_state_version(&self, version: i32) -> MigrationResult<()> {
        self.set(StoreKind::Preferences, STATE_VERSION_KEY, Some(&version))
            .await
    }
}
