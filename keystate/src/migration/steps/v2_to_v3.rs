use std::sync::Arc;

use async_trait::async_trait;

use crate::migration::error::{MigrationError, MigrationResult};
use crate::migration::keys::{user_key, v1, v2, v3};
use crate::migration::state::{
    Account, AccountProfile, AccountSettings, AccountTokens, EnvironmentUrls, State,
};
use crate::migration::step::{MigrationStep, StepOutcome};
use crate::migration::stores::{StateStores, StoreKind};
use crate::session::{TokenIdentity, TokenService};

/// Groups the loose schema 2 keys of the signed-in user into an account record inside the
/// state aggregate, and suffixes the user's remaining keys with `_<userId>`.
///
/// When the stored identity is incomplete but an access token is present, the configured
/// [`TokenService`] backfills it. Stored values always win over token claims.
pub struct V2ToV3Step {
    token_service: Option<Arc<dyn TokenService>>,
}

impl V2ToV3Step {
    /// Creates the step, optionally able to decode identities from access tokens
    #[must_use]
    pub fn new(token_service: Option<Arc<dyn TokenService>>) -> Self {
        Self { token_service }
    }

    /// Asks the token service for the identity behind `access_token`.
    ///
    /// A failure is only fatal when the stored identity is incomplete; otherwise the token
    /// claims are a nice-to-have (name, premium) and the step carries on without them.
    async fn decode_token_identity(
        &self,
        access_token: &str,
        identity_complete: bool,
    ) -> MigrationResult<TokenIdentity> {
        let Some(token_service) = &self.token_service else {
            return Ok(TokenIdentity::default());
        };

        match token_service
            .decode_identity(access_token.to_string())
            .await
        {
            Ok(identity) => Ok(identity),
            Err(e) if identity_complete => {
                crate::warn!("step.v2_to_v3 token_decode_failed error={e}");
                Ok(TokenIdentity::default())
            }
            Err(e) => Err(MigrationError::from(e)),
        }
    }

    async fn read_account(
        stores: &StateStores,
        user_id: String,
        email: String,
        token_identity: TokenIdentity,
        access_token: Option<String>,
    ) -> MigrationResult<Account> {
        let docs = StoreKind::Documents;

        let profile = AccountProfile {
            user_id,
            email,
            name: token_identity.name,
            kdf_type: stores.get(docs, v2::KDF).await?,
            kdf_iterations: stores.get(docs, v2::KDF_ITERATIONS).await?,
            email_verified: stores
                .get::<bool>(docs, v2::EMAIL_VERIFIED)
                .await?
                .or(token_identity.email_verified),
            has_premium: token_identity.premium,
            ..AccountProfile::default()
        };

        let tokens = AccountTokens {
            access_token,
            refresh_token: stores.get(docs, v2::REFRESH_TOKEN).await?,
            ..AccountTokens::default()
        };

        let settings = AccountSettings {
            environment_urls: stores
                .get::<EnvironmentUrls>(StoreKind::Preferences, v1::ENVIRONMENT_URLS)
                .await?,
            vault_timeout: stores.get(docs, v2::VAULT_TIMEOUT).await?,
            vault_timeout_action: stores.get(docs, v2::VAULT_TIMEOUT_ACTION).await?,
            ..AccountSettings::default()
        };

        Ok(Account {
            profile,
            tokens,
            settings,
            ..Account::default()
        })
    }

    /// Moves every per-user key to its `_<userId>` variant within the same store.
    async fn suffix_user_keys(stores: &StateStores, user_id: &str) -> MigrationResult<()> {
        let per_user: [(StoreKind, &[&str]); 3] = [
            (StoreKind::Documents, &v2::PER_USER_DOCUMENTS),
            (StoreKind::Preferences, &v2::PER_USER_PREFERENCES),
            (StoreKind::Secure, &v2::PER_USER_SECURE),
        ];

        for (kind, keys) in per_user {
            for &key in keys {
                let suffixed = user_key(key, user_id);
                stores
                    .relocate((kind, key), (kind, suffixed.as_str()))
                    .await?;
            }
        }
        Ok(())
    }

    async fn remove_superseded_keys(stores: &StateStores) -> MigrationResult<()> {
        stores
            .remove_all(StoreKind::Documents, &v2::ACCOUNT_FIELDS)
            .await?;
        stores
            .remove_all(StoreKind::Documents, &v2::PER_USER_DOCUMENTS)
            .await?;
        stores
            .remove_all(StoreKind::Preferences, &v2::PER_USER_PREFERENCES)
            .await?;
        stores
            .remove_all(StoreKind::Secure, &v2::PER_USER_SECURE)
            .await
    }
}

#[async_trait]
impl MigrationStep for V2ToV3Step {
    fn migration_id(&self) -> String {
        "state.v2_to_v3".to_string()
    }

    fn from_version(&self) -> i32 {
        2
    }

    async fn execute(&self, stores: &StateStores) -> MigrationResult<StepOutcome> {
        let docs = StoreKind::Documents;
        let stored_user_id: Option<String> = stores.get(docs, v2::USER_ID).await?;
        let stored_email: Option<String> = stores.get(docs, v2::USER_EMAIL).await?;
        let access_token: Option<String> = stores.get(docs, v2::ACCESS_TOKEN).await?;

        if stored_user_id.is_none() && access_token.is_none() {
            // signed out: nothing to group, leftovers are dropped
            stores.set_state_version(self.to_version()).await?;
            Self::remove_superseded_keys(stores).await?;
            return Ok(StepOutcome::NothingToMigrate);
        }

        let token_identity = match &access_token {
            Some(token) => {
                let identity_complete = stored_user_id.is_some() && stored_email.is_some();
                self.decode_token_identity(token, identity_complete).await?
            }
            None => TokenIdentity::default(),
        };

        let user_id = stored_user_id
            .or_else(|| token_identity.user_id.clone())
            .ok_or_else(|| MigrationError::MissingRequiredKey {
                store: docs,
                key: v2::USER_ID.to_string(),
            })?;
        let email = stored_email
            .or_else(|| token_identity.email.clone())
            .ok_or_else(|| MigrationError::MissingRequiredKey {
                store: docs,
                key: v2::USER_EMAIL.to_string(),
            })?;

        let account =
            Self::read_account(stores, user_id.clone(), email, token_identity, access_token)
                .await?;

        stores
            .set(docs, v3::STATE, Some(&State::with_single_account(account)))
            .await?;
        Self::suffix_user_keys(stores, &user_id).await?;

        stores.set_state_version(self.to_version()).await?;

        Self::remove_superseded_keys(stores).await?;

        crate::debug!("step.v2_to_v3 user_id={user_id}");
        Ok(StepOutcome::Applied)
    }
}
