use crate::migration::error::MigrationResult;
use crate::migration::keys::{v1, v2};
use crate::migration::stores::{StateStores, StoreKind};

/// Version reported for a device with no persisted state at all
pub const FRESH_INSTALL_VERSION: i32 = 0;

/// Determines the schema version of the data on the device.
///
/// The version marker is the fast path. Installs that predate the marker are classified
/// by sentinel keys: each legacy schema has one key that only exists in that schema,
/// because the step leaving that schema removes it.
pub struct VersionDetector<'a> {
    stores: &'a StateStores,
}

impl<'a> VersionDetector<'a> {
    /// Creates a detector over `stores`
    #[must_use]
    pub const fn new(stores: &'a StateStores) -> Self {
        Self { stores }
    }

    /// Returns the detected version, [`FRESH_INSTALL_VERSION`] when nothing is persisted.
    ///
    /// # Errors
    /// - `MigrationError::JsonError` if the marker is corrupted
    /// - `MigrationError::KeyValueStore` if a store fails
    pub async fn detect(&self) -> MigrationResult<i32> {
        if let Some(version) = self.stores.state_version().await? {
            return Ok(version);
        }

        if self.is_present(StoreKind::Documents, v1::ENVIRONMENT_URLS).await? {
            crate::info!("detector.sentinel version=1 key={}", v1::ENVIRONMENT_URLS);
            return Ok(1);
        }

        if self.is_present(StoreKind::Documents, v2::USER_ID).await? {
            crate::info!("detector.sentinel version=2 key={}", v2::USER_ID);
            return Ok(2);
        }

        Ok(FRESH_INSTALL_VERSION)
    }

    async fn is_present(&self, kind: StoreKind, key: &str) -> MigrationResult<bool> {
        Ok(self
            .stores
            .get::<serde_json::Value>(kind, key)
            .await?
            .is_some())
    }
}
