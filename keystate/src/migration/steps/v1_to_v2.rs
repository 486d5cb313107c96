use async_trait::async_trait;

use crate::migration::error::MigrationResult;
use crate::migration::keys::v1;
use crate::migration::step::{MigrationStep, StepOutcome};
use crate::migration::stores::{StateStores, StoreKind};

/// Moves the application globals from the document store to the preference store.
///
/// Key names are unchanged. Removing `environmentUrls` from the document store retires
/// the schema 1 sentinel.
pub struct V1ToV2Step;

#[async_trait]
impl MigrationStep for V1ToV2Step {
    fn migration_id(&self) -> String {
        "state.v1_to_v2".to_string()
    }

    fn from_version(&self) -> i32 {
        1
    }

    async fn execute(&self, stores: &StateStores) -> MigrationResult<StepOutcome> {
        let mut relocated = 0;
        for key in v1::RELOCATED_GLOBALS {
            if stores
                .relocate((StoreKind::Documents, key), (StoreKind::Preferences, key))
                .await?
            {
                relocated += 1;
            }
        }

        stores.set_state_version(self.to_version()).await?;

        stores
            .remove_all(StoreKind::Documents, &v1::RELOCATED_GLOBALS)
            .await?;

        crate::debug!("step.v1_to_v2 relocated={relocated}");

        Ok(if relocated == 0 {
            StepOutcome::NothingToMigrate
        } else {
            StepOutcome::Applied
        })
    }
}
