use async_trait::async_trait;

use crate::migration::error::MigrationResult;
use crate::migration::keys::{user_key, v3, v4};
use crate::migration::state::{EnvironmentUrls, State};
use crate::migration::step::{MigrationStep, StepOutcome};
use crate::migration::stores::{StateStores, StoreKind};

/// Splits settings out of the state aggregate into per-user preference keys.
///
/// - each account's vault timeout settings move to `vaultTimeout_<uid>` and
///   `vaultTimeoutAction_<uid>` and are cleared from the aggregate,
/// - the global `clearClipboard` preference is copied to every account,
/// - the first account (in insertion order) seeds the login screen's
///   `preAuthEnvironmentUrls`, falling back to the global environment.
///
/// Everything the step reads stays in place until the marker says 4, so an interrupted
/// run can be repeated from the start.
pub struct V3ToV4Step;

impl V3ToV4Step {
    async fn remove_superseded_globals(stores: &StateStores) -> MigrationResult<()> {
        stores
            .remove_all(
                StoreKind::Preferences,
                &[v3::CLEAR_CLIPBOARD, v3::ENVIRONMENT_URLS],
            )
            .await
    }
}

#[async_trait]
impl MigrationStep for V3ToV4Step {
    fn migration_id(&self) -> String {
        "state.v3_to_v4".to_string()
    }

    fn from_version(&self) -> i32 {
        3
    }

    async fn execute(&self, stores: &StateStores) -> MigrationResult<StepOutcome> {
        let prefs = StoreKind::Preferences;
        let state: Option<State> = stores.get(StoreKind::Documents, v3::STATE).await?;
        let clear_clipboard: Option<i32> = stores.get(prefs, v3::CLEAR_CLIPBOARD).await?;
        let global_environment: Option<EnvironmentUrls> =
            stores.get(prefs, v3::ENVIRONMENT_URLS).await?;

        let Some(mut state) = state.filter(|state| !state.accounts.is_empty()) else {
            stores
                .set(
                    prefs,
                    v4::PRE_AUTH_ENVIRONMENT_URLS,
                    global_environment.as_ref(),
                )
                .await?;
            stores.set_state_version(self.to_version()).await?;
            Self::remove_superseded_globals(stores).await?;
            return Ok(StepOutcome::NothingToMigrate);
        };

        for (user_id, account) in &state.accounts {
            let settings = &account.settings;
            stores
                .set(
                    prefs,
                    &user_key(v4::VAULT_TIMEOUT, user_id),
                    settings.vault_timeout.as_ref(),
                )
                .await?;
            stores
                .set(
                    prefs,
                    &user_key(v4::VAULT_TIMEOUT_ACTION, user_id),
                    settings.vault_timeout_action.as_ref(),
                )
                .await?;
            stores
                .set(
                    prefs,
                    &user_key(v4::CLEAR_CLIPBOARD, user_id),
                    clear_clipboard.as_ref(),
                )
                .await?;
        }

        let first_account_environment = state
            .accounts
            .first()
            .and_then(|(_, account)| account.settings.environment_urls.clone());
        stores
            .set(
                prefs,
                v4::PRE_AUTH_ENVIRONMENT_URLS,
                first_account_environment.or(global_environment).as_ref(),
            )
            .await?;

        stores.set_state_version(self.to_version()).await?;

        // until marker 4 the aggregate is the source of the per-user keys
        for account in state.accounts.values_mut() {
            account.settings.vault_timeout = None;
            account.settings.vault_timeout_action = None;
        }
        stores
            .set(StoreKind::Documents, v3::STATE, Some(&state))
            .await?;

        Self::remove_superseded_globals(stores).await?;

        crate::debug!("step.v3_to_v4 accounts={}", state.accounts.len());
        Ok(StepOutcome::Applied)
    }
}
